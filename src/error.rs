use derive_more::{Display, Error};

#[derive(Debug, Display, Error)]
pub enum ConfigError {
    #[display("failed to read config file")]
    ReadFile,
    #[display("failed to parse config: {reason}")]
    Parse { reason: String },
    #[display("invalid config: {field}")]
    Validation { field: String },
    #[display("missing environment variable {name}")]
    MissingEnv { name: String },
}

#[derive(Debug, Display, Error)]
pub enum ProviderError {
    #[display("failed to connect to {provider}")]
    Connection { provider: String },
    #[display("request to {provider} failed")]
    Request { provider: String },
    #[display("authentication rejected by {provider}")]
    Authentication { provider: String },
    #[display("rate limit exceeded for {provider}")]
    RateLimit { provider: String },
    #[display("failed to parse response from {provider}")]
    ResponseParse { provider: String },
    #[display("invalid {provider} client configuration")]
    Configuration { provider: String },
}

#[derive(Debug, Display, Error)]
pub enum IndicatorError {
    #[display("invalid parameter: {name}")]
    InvalidParameter { name: String },
}

#[derive(Debug, Display, Error)]
pub enum SymbolError {
    #[display("ticker must not be empty")]
    Empty,
    #[display("ticker contains invalid character {found:?}")]
    InvalidCharacter { found: char },
}

#[derive(Debug, Display, Error)]
pub enum ErrorLogError {
    #[display("failed to open error log")]
    Open,
    #[display("failed to write error log entry")]
    Write,
}

/// Failure of one run of the fetch-then-compute pipeline.
#[derive(Debug, Display, Error)]
pub enum PipelineError {
    #[display("failed to fetch aggregates for {ticker}")]
    Fetch { ticker: String },
    #[display("failed to compute indicator for {ticker}")]
    Indicator { ticker: String },
    #[display("failed to look up {ticker}")]
    Lookup { ticker: String },
}

/// Human-readable message returned by the provider alongside a failure.
#[derive(Debug, Display)]
#[display("{_0}")]
pub struct ProviderMessage(pub String);
