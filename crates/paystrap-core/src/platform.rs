//! Stripe CLI command catalogue
//!
//! Builds the invocations the pipeline needs. The CLI is treated as a black
//! box; only the command shapes live here.

use crate::process::Invocation;
use paystrap_config::PayoutInterval;

/// Stripe CLI invocations, bound to a program name or path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformCli {
    program: String,
}

impl PlatformCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// `stripe login`, run against the operator's terminal
    pub fn login(&self) -> Invocation {
        Invocation::new(&self.program, ["login"]).interactive()
    }

    /// `stripe get /v1/account`
    pub fn account(&self) -> Invocation {
        Invocation::new(&self.program, ["get", "/v1/account"])
    }

    /// `stripe config --list`, which includes the stored API keys
    pub fn list_keys(&self) -> Invocation {
        Invocation::new(&self.program, ["config", "--list"])
    }

    /// `stripe listen --forward-to <url>`
    pub fn listen(&self, forward_to: &str) -> Invocation {
        Invocation::new(&self.program, ["listen", "--forward-to", forward_to])
    }

    /// `stripe post /v1/accounts/<id>/capabilities/<cap> -d requested=true`
    pub fn enable_capability(&self, account_id: &str, capability: &str) -> Invocation {
        Invocation::new(
            &self.program,
            [
                "post".to_string(),
                format!("/v1/accounts/{}/capabilities/{}", account_id, capability),
                "-d".to_string(),
                "requested=true".to_string(),
            ],
        )
    }

    /// `stripe post /v1/account -d settings[payouts][schedule][interval]=<interval>`
    pub fn payout_schedule(&self, interval: PayoutInterval) -> Invocation {
        Invocation::new(
            &self.program,
            [
                "post".to_string(),
                "/v1/account".to_string(),
                "-d".to_string(),
                format!("settings[payouts][schedule][interval]={}", interval),
            ],
        )
    }
}
