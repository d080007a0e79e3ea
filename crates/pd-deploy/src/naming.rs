//! Deterministic certificate pool names.
//!
//! A deployed certificate is registered under `"{domain} {fingerprint}"`,
//! where the fingerprint is the first 12 hex characters of a SHA-256 digest
//! over the DER-encoded leaf certificate. The same (domain, content) pair
//! always produces the same name across runs, so renewal detection works by
//! string comparison against the pool listing alone, without fetching
//! certificate bytes back from the panel.

use ring::digest;

const FINGERPRINT_LEN: usize = 12;

/// Name under which a certificate is registered in the panel's pool.
pub fn cert_name(domain: &str, leaf_der: &[u8]) -> String {
    let digest = digest::digest(&digest::SHA256, leaf_der);
    let fingerprint = hex::encode(digest.as_ref());
    format!("{} {}", domain, &fingerprint[..FINGERPRINT_LEN])
}

/// Whether a pool entry name was produced by [`cert_name`] for this domain.
///
/// Entries the panel holds for other domains, or that were not installed by
/// this tool, never match.
pub fn name_belongs_to(name: &str, domain: &str) -> bool {
    name.strip_prefix(domain)
        .is_some_and(|rest| rest.starts_with(' '))
}
