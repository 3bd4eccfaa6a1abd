use anyhow::{Context, Result};
use serde::Serialize;

use authcheck_lib::{MxHost, MxResolver, system_resolver};

use crate::output::{Format, print_json};

#[derive(Serialize)]
struct MxPayload<'a> {
    domain: &'a str,
    hosts: &'a [MxHost],
}

pub fn run_mx(domain: &str, format: Format) -> Result<bool> {
    let resolver = MxResolver::new(system_resolver()?);
    let hosts = resolver
        .resolve(domain)
        .with_context(|| format!("resolving mail exchangers of {domain}"))?;

    match format {
        Format::Human => {
            if hosts.is_empty() {
                println!("{domain}: no MX records");
            }
            for host in &hosts {
                println!("{:>5} {}", host.preference, host.host);
            }
        }
        Format::Json => print_json(&MxPayload {
            domain,
            hosts: &hosts,
        })?,
    }
    Ok(!hosts.is_empty())
}
