use anyhow::Result;
use serde::Serialize;

use authcheck_lib::{AuthConfig, PolicyVerdict, ProbeVerdict, VerifyError};

use crate::output::{Format, print_json};

#[derive(Serialize)]
struct VerdictPayload<'a> {
    host: &'a str,
    accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

impl<'a> From<&'a ProbeVerdict> for VerdictPayload<'a> {
    fn from(verdict: &'a ProbeVerdict) -> Self {
        Self {
            host: &verdict.host,
            accepted: verdict.accepted,
            reason: verdict.reason.as_ref().map(ToString::to_string),
        }
    }
}

#[derive(Serialize)]
struct VerifyPayload<'a> {
    email: &'a str,
    live: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    verdicts: Vec<VerdictPayload<'a>>,
}

/// `Ok(false)` for a negative answer (bad syntax, policy, unreachable).
/// Resolution faults are fatal.
pub fn run_verify(config: &AuthConfig, email: &str, format: Format) -> Result<bool> {
    let verifier = config.verifier()?;
    let result = match verifier.verify_report(email) {
        Err(VerifyError::Resolution(err)) => return Err(err.into()),
        other => other,
    };

    match format {
        Format::Human => match &result {
            Ok(report) => {
                println!("[LIVE]  {}", report.address);
                print_verdicts(&report.outcome.verdicts);
            }
            Err(err) => {
                println!("[DEAD]  {email} :: {err}");
                if let VerifyError::Unreachable { verdicts, .. } = err {
                    print_verdicts(verdicts);
                }
            }
        },
        Format::Json => {
            let payload = match &result {
                Ok(report) => VerifyPayload {
                    email,
                    live: true,
                    identifier: Some(report.address.identifier()),
                    error: None,
                    verdicts: report.outcome.verdicts.iter().map(Into::into).collect(),
                },
                Err(err) => VerifyPayload {
                    email,
                    live: false,
                    identifier: None,
                    error: Some(err.to_string()),
                    verdicts: match err {
                        VerifyError::Unreachable { verdicts, .. } => {
                            verdicts.iter().map(Into::into).collect()
                        }
                        _ => Vec::new(),
                    },
                },
            };
            print_json(&payload)?;
        }
    }
    Ok(result.is_ok())
}

fn print_verdicts(verdicts: &[ProbeVerdict]) {
    for verdict in verdicts {
        println!("        {verdict}");
        for line in &verdict.transcript {
            println!("          {line}");
        }
    }
}

#[derive(Serialize)]
struct PolicyPayload<'a> {
    domain: &'a str,
    #[serde(flatten)]
    verdict: PolicyVerdict,
    rejected: bool,
}

pub fn run_policy(config: &AuthConfig, domain: &str, format: Format) -> Result<bool> {
    let verdict = config.policy().classify(domain);
    let rejected = verdict.rejects();
    match format {
        Format::Human => {
            let label = if rejected { "REJECT" } else { "ALLOW" };
            println!("[{label}] {domain} ({verdict:?})");
        }
        Format::Json => print_json(&PolicyPayload {
            domain,
            verdict,
            rejected,
        })?,
    }
    Ok(!rejected)
}
