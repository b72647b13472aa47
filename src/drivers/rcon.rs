//! Generic console command driver.
//!
//! Delivery is the act of sending commands: the request's `command` template
//! is split on newlines and semicolons, each line has its placeholders
//! substituted and is sent on its own. Nothing is stored.
//!
//! | Placeholder | Value |
//! |-------------|-------|
//! | `{{steam32}}` | Steam2 rendering |
//! | `{{steam64}}` | 64-bit Steam id |
//! | `{{accountId}}` | 32-bit account id |
//! | `{{login}}`, `{{name}}`, `{{email}}`, `{{uri}}` | user fields |
//! | `{{days}}`, `{{hours}}`, `{{minutes}}`, `{{seconds}}` | duration components |
//! | `{{time}}` | duration in seconds |
//! | `{{expires}}` | absolute expiry, 0 when permanent |
//!
//! Single-brace spellings (`{accountId}`) are accepted as well.

use std::collections::HashMap;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::{Captures, Regex};
use tracing::info;

use super::{DeliveryContext, DeliveryReport, Driver, steam_identity};
use crate::error::{DeliveryError, DeliveryResult};
use crate::grant::requested_duration;
use crate::identity::NormalizedIdentity;
use crate::model::GrantRequest;
use crate::notify::{Endpoint, run_batch};
use crate::params::{ParamSchema, ParamSpec, ValidatedParams};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{(\w+)\}\}|\{(\w+)\}").expect("placeholder pattern is valid")
});

static IDENTITY_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\{\{?(steam32|steam64|accountid)\}\}?").expect("identity pattern is valid")
});

const SCHEMA: ParamSchema = ParamSchema::new(&[
    ParamSpec::required_text("command"),
    ParamSpec::int("time", Some(0)),
]);

#[derive(Debug, Clone, Copy, Default)]
pub struct RconDriver;

/// Whether `template` references the platform identity.
pub fn needs_identity(template: &str) -> bool {
    IDENTITY_PLACEHOLDER.is_match(template)
}

/// Non-empty, trimmed command lines of `template`.
pub fn split_commands(template: &str) -> Vec<&str> {
    template
        .split(['\n', ';'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Placeholder values, keyed by lowercase name.
pub fn placeholder_values(
    request: &GrantRequest,
    identity: Option<&NormalizedIdentity>,
    duration: u64,
    now: i64,
) -> HashMap<&'static str, String> {
    let user = &request.user;
    let (steam32, steam64, account_id) = match identity {
        Some(id) => (id.steam2.clone(), id.steam64.clone(), id.account_id.clone()),
        None => Default::default(),
    };
    let expires = if duration == 0 {
        0
    } else {
        now.saturating_add(i64::try_from(duration).unwrap_or(i64::MAX))
    };

    HashMap::from([
        ("steam32", steam32),
        ("steam64", steam64),
        ("accountid", account_id),
        ("login", user.login.clone()),
        ("name", user.name.clone()),
        ("email", user.email.clone().unwrap_or_default()),
        ("uri", user.uri.clone()),
        ("days", (duration / 86_400).to_string()),
        ("hours", (duration % 86_400 / 3_600).to_string()),
        ("minutes", (duration % 3_600 / 60).to_string()),
        ("seconds", (duration % 60).to_string()),
        ("time", duration.to_string()),
        ("expires", expires.to_string()),
    ])
}

/// Substitute known placeholders; unknown ones are left as written.
pub fn render(line: &str, values: &HashMap<&'static str, String>) -> String {
    PLACEHOLDER
        .replace_all(line, |caps: &Captures<'_>| {
            let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            match values.get(name.to_ascii_lowercase().as_str()) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[async_trait]
impl Driver for RconDriver {
    fn alias(&self) -> &str {
        "rcon"
    }

    fn schema(&self) -> ParamSchema {
        SCHEMA
    }

    async fn deliver(
        &self,
        ctx: &DeliveryContext,
        request: &GrantRequest,
        params: &ValidatedParams,
    ) -> DeliveryResult<DeliveryReport> {
        let server = &request.server;
        let secret = server
            .rcon_secret()
            .ok_or_else(|| DeliveryError::config(format!("Server {} rcon empty", server.name)))?;
        let template = params.require_text("command")?;
        let duration = requested_duration(params, request.time_override)?;

        let identity = if needs_identity(template) {
            Some(steam_identity(request)?)
        } else {
            None
        };
        let values = placeholder_values(request, identity.as_ref(), duration, ctx.clock.now());
        let commands: Vec<String> = split_commands(template)
            .into_iter()
            .map(|line| render(line, &values))
            .collect();

        let endpoint = Endpoint::for_server(server, ctx.connect_timeout);
        let mut console = ctx.consoles.create();
        let outcome = run_batch(
            console.as_mut(),
            &endpoint,
            secret,
            &commands,
            ctx.command_failure_policy,
        )
        .await?;

        info!(
            alias = "rcon",
            server = %server.name,
            sent = outcome.sent,
            skipped = outcome.skipped.len(),
            "Commands delivered"
        );

        Ok(DeliveryReport {
            notified: true,
            commands_sent: outcome.sent,
            commands_skipped: outcome.skipped,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ServerTarget, UserIdentity};

    fn request() -> GrantRequest {
        let user = UserIdentity {
            name: "alice".into(),
            login: "alice01".into(),
            ..Default::default()
        };
        GrantRequest::new("rcon", user, ServerTarget::default())
    }

    #[test]
    fn test_split_commands() {
        assert_eq!(
            split_commands("say hi;kick {accountId}\n\n ; sm_reload ;"),
            vec!["say hi", "kick {accountId}", "sm_reload"]
        );
        assert!(split_commands(" ; \n").is_empty());
    }

    #[test]
    fn test_needs_identity_case_insensitive() {
        assert!(needs_identity("kick {{STEAM64}}"));
        assert!(needs_identity("kick {accountId}"));
        assert!(!needs_identity("say {{name}}"));
    }

    #[test]
    fn test_render_both_spellings() {
        let identity = NormalizedIdentity::resolve("STEAM_1:1:22202");
        let values = placeholder_values(&request(), Some(&identity), 90_061, 1_000);
        assert_eq!(
            render("vip {{steam32}} {accountId} {{name}}", &values),
            "vip STEAM_1:1:22202 44405 alice"
        );
        assert_eq!(
            render("{{days}}d {{hours}}h {{minutes}}m {{seconds}}s until {{expires}}", &values),
            "1d 1h 1m 1s until 91061"
        );
        assert_eq!(render("{{unknown}} {login}", &values), "{{unknown}} alice01");
    }

    #[test]
    fn test_permanent_duration_values() {
        let values = placeholder_values(&request(), None, 0, 1_000);
        assert_eq!(values["expires"], "0");
        assert_eq!(values["steam64"], "");
    }
}
