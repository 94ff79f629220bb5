//! Per-provider domain allow-list.
//!
//! A plan link that resolves outside its provider's official domains is
//! treated as broken even when the page answers 200 (parked or hijacked
//! domains, affiliate landing pages). Providers without an entry are not
//! restricted.
//!
//! The policy is a plain value built once at startup and shared read-only
//! between probe tasks behind an `Arc`.

use std::collections::HashMap;
use std::path::Path;

use serde_json::json;

use crate::error::AppError;
use crate::utils::extract_domain::host_of_entry;

/// Allow-list of official domains per insurance provider.
#[derive(Debug, Clone, Default)]
pub struct DomainPolicy {
    /// Keyed by lowercased provider name. Hosts are lowercased, order kept.
    entries: HashMap<String, Vec<String>>,
}

impl DomainPolicy {
    /// A policy with no entries: every provider is permissive.
    pub fn permissive() -> Self {
        Self::default()
    }

    /// Builds a policy from `(provider, domains)` pairs.
    ///
    /// Domain entries are reduced to their host part and lowercased.
    /// Duplicate providers (compared case-insensitively) are merged.
    pub fn from_entries<I, P, D, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (P, D)>,
        P: AsRef<str>,
        D: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut map: HashMap<String, Vec<String>> = HashMap::new();

        for (provider, domains) in entries {
            let hosts = map.entry(provider_key(provider.as_ref())).or_default();
            for domain in domains {
                let host = host_of_entry(domain.as_ref());
                if !host.is_empty() && !hosts.contains(&host) {
                    hosts.push(host);
                }
            }
        }

        Self { entries: map }
    }

    /// The allow-list maintained for the production catalogue.
    pub fn builtin() -> Self {
        Self::from_entries([
            ("Seguros SURA", vec!["sura.com", "segurossura.com.co"]),
            ("Mapfre", vec!["mapfre.com.co"]),
            (
                "Seguros Bolívar",
                vec!["segurosbolivar.com", "www.segurosbolivar.com"],
            ),
            ("Seguros del Estado", vec!["segurosdelestado.com"]),
            ("AXA Colpatria", vec!["axa-colpatria.co", "axa.co"]),
            (
                "Liberty Seguros",
                vec!["libertycolombia.com.co", "libertyseguros.co"],
            ),
            ("Allianz", vec!["allianz.co"]),
            ("HDI Seguros", vec!["hdi.com.co"]),
            ("Chubb", vec!["chubb.com", "chubb.com/co-es"]),
            ("Colmena Seguros", vec!["colmena.com.co"]),
            ("Colsanitas", vec!["colsanitas.com"]),
            (
                "BMI Cos",
                vec![
                    "bmicos.com.co",
                    "www.bmicos.com.co",
                    "bmicos.com",
                    "www.bmicos.com",
                ],
            ),
        ])
    }

    /// Loads a policy from a JSON object of `provider -> [domains]`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the file cannot be read or is not
    /// a JSON object of string arrays.
    pub fn from_json_file(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::bad_request(
                "Cannot read domain policy file",
                json!({ "path": path.display().to_string(), "reason": e.to_string() }),
            )
        })?;

        Self::from_json_str(&raw).map_err(|e| match e {
            AppError::Validation { message, details } => AppError::Validation {
                message,
                details: json!({ "path": path.display().to_string(), "reason": details }),
            },
            other => other,
        })
    }

    /// Parses a policy from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] on malformed JSON.
    pub fn from_json_str(raw: &str) -> Result<Self, AppError> {
        let map: HashMap<String, Vec<String>> = serde_json::from_str(raw).map_err(|e| {
            AppError::bad_request("Invalid domain policy", json!(e.to_string()))
        })?;

        Ok(Self::from_entries(map))
    }

    /// Number of providers with an entry.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn allowed_hosts(&self, provider: &str) -> Option<&[String]> {
        self.entries
            .get(&provider_key(provider))
            .map(Vec::as_slice)
            .filter(|hosts| !hosts.is_empty())
    }

    /// Returns true if `hostname` is acceptable for `provider`.
    ///
    /// Unknown providers are permissive. Otherwise the hostname must equal a
    /// listed domain or be a subdomain of one, compared case-insensitively.
    pub fn is_allowed(&self, provider: &str, hostname: &str) -> bool {
        self.matched_domain(provider, hostname).is_some()
    }

    /// Returns the domain that accepted `hostname`.
    ///
    /// For permissive providers this is the hostname itself. `None` means
    /// the hostname is off-policy.
    pub fn matched_domain(&self, provider: &str, hostname: &str) -> Option<String> {
        let host = hostname.trim().trim_end_matches('.').to_ascii_lowercase();

        let Some(allowed) = self.allowed_hosts(provider) else {
            return Some(host);
        };

        allowed
            .iter()
            .find(|domain| host_matches(&host, domain))
            .cloned()
    }

    /// First listed domain for `provider`, recorded as its official domain.
    pub fn official_domain(&self, provider: &str) -> Option<&str> {
        self.allowed_hosts(provider)
            .and_then(|hosts| hosts.first())
            .map(String::as_str)
    }
}

fn provider_key(provider: &str) -> String {
    provider.trim().to_lowercase()
}

/// Exact match or subdomain match on a `.` boundary.
fn host_matches(host: &str, domain: &str) -> bool {
    host == domain
        || (host.len() > domain.len()
            && host.ends_with(domain)
            && host.as_bytes()[host.len() - domain.len() - 1] == b'.')
}
