// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! TLS setup shared by the Logentries REST client and the website session
//! client. Both are blocking clients, so this hands out
//! [`reqwest::blocking::ClientBuilder`]s.

use reqwest::blocking::ClientBuilder;
use std::error::Error;
#[cfg(feature = "fips")]
use tracing::debug;

/// Builder for the Logentries clients using reqwest's bundled rustls setup.
#[cfg(not(feature = "fips"))]
pub fn create_reqwest_client_builder() -> Result<ClientBuilder, Box<dyn Error>> {
    Ok(reqwest::blocking::Client::builder().use_rustls_tls())
}

/// Builder for the Logentries clients restricted to the process-wide FIPS
/// crypto provider and the platform's root certificates.
///
/// Fails unless a FIPS provider was installed before the first client is
/// built, e.g. with `rustls::crypto::default_fips_provider().install_default()`.
#[cfg(feature = "fips")]
pub fn create_reqwest_client_builder() -> Result<ClientBuilder, Box<dyn Error>> {
    let provider = rustls::crypto::CryptoProvider::get_default()
        .ok_or("no rustls crypto provider installed for the Logentries client")?;
    if !provider.fips() {
        return Err("installed rustls crypto provider is not FIPS approved".into());
    }

    let config = rustls::ClientConfig::builder_with_provider(provider.clone())
        .with_protocol_versions(rustls::ALL_VERSIONS)
        .map_err(|e| format!("unsupported TLS versions for the FIPS provider: {e}"))?
        .with_root_certificates(native_root_store()?)
        .with_no_client_auth();
    if !config.fips() {
        return Err("Logentries TLS configuration is not FIPS compliant".into());
    }

    debug!("Logentries clients use the FIPS TLS configuration");
    Ok(reqwest::blocking::Client::builder().use_preconfigured_tls(config))
}

/// Platform root certificates. Unparseable entries are skipped, an empty
/// store is an error.
#[cfg(feature = "fips")]
fn native_root_store() -> Result<rustls::RootCertStore, Box<dyn Error>> {
    let mut store = rustls::RootCertStore::empty();
    let loaded = rustls_native_certs::load_native_certs();
    for error in &loaded.errors {
        debug!("skipping native root certificate source: {error}");
    }
    let (added, ignored) = store.add_parsable_certificates(loaded.certs);
    if ignored > 0 {
        debug!(ignored, "skipped unparseable native root certificates");
    }
    if added == 0 {
        return Err("no usable root certificates for the Logentries API".into());
    }
    Ok(store)
}

#[cfg(all(test, not(feature = "fips")))]
mod tests {
    use super::*;

    #[test]
    fn default_builder_produces_a_client() {
        let builder = create_reqwest_client_builder().expect("builder should be created");
        assert!(builder.build().is_ok());
    }
}
