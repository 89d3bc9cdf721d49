//! paystrap core
//!
//! Credential bootstrap and webhook provisioning for a Stripe account.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                    Pipeline                      │
//! │  CheckingEnvironment → … → Verifying             │
//! └───────┬──────────────┬──────────────┬───────────┘
//!         │              │              │
//! ┌───────▼──────┐ ┌─────▼──────┐ ┌─────▼──────────┐
//! │   Gateway    │ │ Extractor  │ │   Persister    │
//! │ (stripe CLI) │ │ (patterns) │ │ (.env + store) │
//! └───────┬──────┘ └────────────┘ └────────────────┘
//!         │
//! ┌───────▼──────────┐
//! │ WebhookProvisioner│
//! │  (stripe listen)  │
//! └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use paystrap_config::{BootstrapConfig, FileSettingsStore};
//! use paystrap_core::{NoopObserver, Pipeline, SystemGateway};
//!
//! let config = BootstrapConfig::default();
//! let store = FileSettingsStore::new(config.settings_path()?);
//! let gateway = SystemGateway::new();
//!
//! let outcome = Pipeline::new(&gateway, &store, config)
//!     .run(&mut NoopObserver)
//!     .await;
//! std::process::exit(outcome.exit_code());
//! ```

pub mod bundle;
pub mod error;
pub mod extract;
pub mod persist;
pub mod pipeline;
pub mod platform;
pub mod process;
pub mod webhook;

pub use bundle::CredentialBundle;
pub use error::{BootstrapError, Result, ScanBound, StageFailure};
pub use extract::{AccountStatus, Field, extract, extract_from_lines};
pub use persist::{EnvFileWriter, forward_to_config_store, render_base};
pub use pipeline::{
    NoopObserver, Pipeline, PipelineOutcome, RunReport, RunStatus, Stage, StageObserver, verify,
};
pub use platform::PlatformCli;
pub use process::{
    DetachedProcess, Invocation, InvocationMode, ProcessGateway, ProcessOutput, SystemGateway,
};
pub use webhook::{ProvisionerState, RelayHandle, ScanBounds, WebhookProvisioner};
