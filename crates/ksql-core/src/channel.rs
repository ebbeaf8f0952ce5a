use crate::Query;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix shared by every channel this data source opens
pub const CHANNEL_PREFIX: &str = "ksql/custom-";

/// Root segment the backend accepts subscriptions for
pub const CHANNEL_ROOT: &str = "ksql/";

/// Token standing in for a query without a timeout. Never a valid number.
pub const UNSET_TIMEOUT_TOKEN: &str = "unset";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiveChannelScope {
    DataSource,
}

/// Address of one live subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelAddress {
    pub scope: LiveChannelScope,

    /// Owning data source instance id
    pub namespace: String,

    pub path: String,

    /// Full query, so the receiver needs no side-channel lookup
    pub data: Query,
}

impl ChannelAddress {
    pub fn for_query(namespace: impl Into<String>, query: Query) -> Self {
        Self {
            scope: LiveChannelScope::DataSource,
            namespace: namespace.into(),
            path: channel_path(&query),
            data: query,
        }
    }
}

impl fmt::Display for ChannelAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ds/{}/{}", self.namespace, self.path)
    }
}

/// Derive the channel path of a query: `ksql/custom-<refId>-<timeout>`.
///
/// The timeout is always the last segment and is either a decimal number
/// or [`UNSET_TIMEOUT_TOKEN`], so a changed timeout always yields a new path.
pub fn channel_path(query: &Query) -> String {
    let timeout = match query.timeout {
        Some(secs) => secs.to_string(),
        None => UNSET_TIMEOUT_TOKEN.to_string(),
    };
    format!("{}{}-{}", CHANNEL_PREFIX, query.ref_id, timeout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_channel_path_format() {
        let query = Query::new("A", "SELECT 1;").with_timeout(Some(30));
        assert_eq!(channel_path(&query), "ksql/custom-A-30");

        let unset = Query::new("A", "SELECT 1;").with_timeout(None);
        assert_eq!(channel_path(&unset), "ksql/custom-A-unset");
    }

    #[test]
    fn test_address_carries_full_query() {
        let query = Query::new("B", "SHOW STREAMS;");
        let addr = ChannelAddress::for_query("uid-1", query.clone());

        assert_eq!(addr.scope, LiveChannelScope::DataSource);
        assert_eq!(addr.namespace, "uid-1");
        assert_eq!(addr.data, query);
        assert_eq!(addr.to_string(), "ds/uid-1/ksql/custom-B-60");

        let value = serde_json::to_value(&addr).unwrap();
        assert_eq!(value["scope"], "datasource");
        assert_eq!(value["data"]["refId"], "B");
    }

    proptest! {
        #[test]
        fn prop_distinct_timeouts_give_distinct_paths(
            ref_id in "[A-Za-z0-9-]{0,8}",
            a in proptest::option::of(any::<u64>()),
            b in proptest::option::of(any::<u64>()),
        ) {
            prop_assume!(a != b);
            let qa = Query::new(ref_id.clone(), "q").with_timeout(a);
            let qb = Query::new(ref_id, "q").with_timeout(b);
            prop_assert_ne!(channel_path(&qa), channel_path(&qb));
        }

        #[test]
        fn prop_path_derivation_is_idempotent(
            ref_id in "[A-Za-z0-9-]{0,8}",
            timeout in proptest::option::of(any::<u64>()),
        ) {
            let first = Query::new(ref_id.clone(), "q").with_timeout(timeout);
            let second = Query::new(ref_id, "other text").with_timeout(timeout);
            prop_assert_eq!(channel_path(&first), channel_path(&second));
        }
    }
}
