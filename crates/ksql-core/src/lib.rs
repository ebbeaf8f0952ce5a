mod channel;
mod datasource;
mod editor;
mod error;
mod frame;
mod live;
mod query;
mod resource;
mod settings;
mod stream;
mod template;
mod validator;

pub use channel::{
    channel_path, ChannelAddress, LiveChannelScope, CHANNEL_PREFIX, CHANNEL_ROOT,
    UNSET_TIMEOUT_TOKEN,
};
pub use datasource::{DataQueryRequest, KsqlDataSource};
pub use editor::{DataSourceOptions, OptionsUpdate};
pub use error::{Error, Result};
pub use frame::{DataFrame, DataQueryResponse, Field, FieldValues};
pub use live::LiveStreamService;
pub use query::{Query, QueryUpdate, DEFAULT_TIMEOUT_SECS};
pub use resource::{HealthResponse, ResourceClient, HEALTH_OK, HEALTH_RESOURCE};
pub use settings::{
    DataSourceJsonData, InstanceSettings, PluginSettings, SecureJsonData, SecureJsonFields,
    PASSWORD_KEY,
};
pub use stream::{PublishStreamStatus, StreamHandler, SubscribeStreamStatus};
pub use template::{ScopedVars, TemplateSrv, VariableTemplateSrv};
pub use validator::{
    validate_connectivity, ValidationResult, ValidationStatus, ValidatorOptions,
};
