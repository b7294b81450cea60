pub mod provider_api;
