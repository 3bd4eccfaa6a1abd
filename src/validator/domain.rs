/// Converts the domain part to lowercase ASCII (IDNA) and checks label
/// lengths, which the grammar does not bound.
/// Pushes invalidating reasons into `reasons`.
pub(crate) fn normalize_domain(domain: &str, reasons: &mut Vec<String>) -> Option<String> {
    let domain_ascii = match idna::domain_to_ascii(domain) {
        Ok(d) => d.to_ascii_lowercase(),
        Err(_) => {
            reasons.push("domain punycode conversion failed".to_string());
            return None;
        }
    };

    if domain_ascii.is_empty() {
        reasons.push("domain empty after IDNA conversion".to_string());
        return None;
    }

    for label in domain_ascii.split('.') {
        if label.len() > 63 {
            reasons.push(format!(
                "domain label '{}' length {} > 63",
                label,
                label.len()
            ));
        }
    }
    Some(domain_ascii)
}

/// Splits a bracketed domain literal into its probe address.
/// `[192.0.2.1]` gives `192.0.2.1`, `[IPv6:2001:db8::1]` gives `2001:db8::1`.
pub(crate) fn literal_address(domain: &str) -> Option<String> {
    let inner = domain.strip_prefix('[')?.strip_suffix(']')?;
    let address = match inner.split_once(':') {
        Some((tag, rest)) if tag.eq_ignore_ascii_case("ipv6") => rest,
        _ => inner,
    };
    Some(address.to_string())
}
