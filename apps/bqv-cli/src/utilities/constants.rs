pub const CLI_VERSION: &str = env!("BQV_CLI_VERSION");

pub const CLI_USER_DIRECTORY: &str = ".bqv";
pub const CLI_CONFIG_FILE: &str = "config.toml";
pub const CLI_LOG_FILE_PREFIX: &str = "cli.log";
pub const ENVIRONMENT_VARIABLE_PREFIX: &str = "BQV";

pub const DEFAULT_BASE_DIR: &str = ".";
pub const DEFAULT_PARAM_FILE: &str = ".params";

pub const QUERY_FILE: &str = "query.sql";
pub const META_FILE: &str = "meta.json";

pub const BIGQUERY_ENDPOINT: &str = "https://bigquery.googleapis.com/bigquery/v2";
pub const ACCESS_TOKEN_ENV_VAR: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";
pub const PROJECT_ID_ENV_VAR: &str = "GOOGLE_CLOUD_PROJECT";
