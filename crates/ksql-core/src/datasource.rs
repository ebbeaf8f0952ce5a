use crate::channel::ChannelAddress;
use crate::live::LiveStreamService;
use crate::resource::ResourceClient;
use crate::settings::DataSourceJsonData;
use crate::template::{ScopedVars, TemplateSrv};
use crate::validator::{validate_connectivity, ValidationResult, ValidatorOptions};
use crate::{DataQueryResponse, Query};
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// A batch of queries submitted together
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQueryRequest {
    pub targets: Vec<Query>,

    #[serde(default)]
    pub scoped_vars: ScopedVars,
}

impl DataQueryRequest {
    pub fn new(targets: Vec<Query>) -> Self {
        Self {
            targets,
            scoped_vars: ScopedVars::new(),
        }
    }
}

/// Data source adapter routing queries into live channels
pub struct KsqlDataSource {
    uid: String,
    json_data: DataSourceJsonData,
    live: Arc<dyn LiveStreamService>,
    resources: Arc<dyn ResourceClient>,
    templates: Arc<dyn TemplateSrv>,
    validator_options: ValidatorOptions,
}

impl KsqlDataSource {
    pub fn new(
        uid: impl Into<String>,
        json_data: DataSourceJsonData,
        live: Arc<dyn LiveStreamService>,
        resources: Arc<dyn ResourceClient>,
        templates: Arc<dyn TemplateSrv>,
    ) -> Self {
        Self {
            uid: uid.into(),
            json_data,
            live,
            resources,
            templates,
            validator_options: ValidatorOptions::default(),
        }
    }

    pub fn with_validator_options(mut self, options: ValidatorOptions) -> Self {
        self.validator_options = options;
        self
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn json_data(&self) -> &DataSourceJsonData {
        &self.json_data
    }

    /// Query a new panel starts with
    pub fn default_query(&self, ref_id: impl Into<String>) -> Query {
        Query::new(ref_id, "")
    }

    pub fn filter_query(&self, query: &Query) -> bool {
        query.is_eligible()
    }

    pub fn apply_template_variables(&self, query: &Query, scoped_vars: &ScopedVars) -> Query {
        Query {
            query_text: self.templates.replace(&query.query_text, scoped_vars),
            ..query.clone()
        }
    }

    /// Subscribe every eligible query to its own channel and merge the results.
    ///
    /// Events of one channel keep their order; events of different channels
    /// interleave as they arrive.
    pub fn query(&self, request: DataQueryRequest) -> BoxStream<'static, DataQueryResponse> {
        let total = request.targets.len();

        let streams: Vec<_> = request
            .targets
            .iter()
            .filter(|query| self.filter_query(query))
            .map(|query| self.apply_template_variables(query, &request.scoped_vars))
            .map(|query| {
                let addr = ChannelAddress::for_query(self.uid.clone(), query);
                debug!("Subscribing to channel {}", addr);
                self.live.get_data_stream(addr)
            })
            .collect();

        info!(
            "Routing {} of {} queries for data source '{}'",
            streams.len(),
            total,
            self.uid
        );

        stream::select_all(streams).boxed()
    }

    /// Connection test backing the host's "test" action
    pub async fn test_datasource(&self) -> ValidationResult {
        validate_connectivity(&self.json_data, self.resources.as_ref(), self.validator_options).await
    }
}
