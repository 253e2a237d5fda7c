//! Read-only account queries.
//!
//! An account with nothing registered yields an empty list or `None`; a
//! response that does not have the expected shape is an error, so the two
//! cases never look alike to the caller.

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::Result;

use super::client::RunPodClient;
use super::types::NetworkVolume;

/// Account inventory queries.
#[derive(Debug)]
pub struct Inventory {
    /// `RunPod` API client.
    client: RunPodClient,
}

/// How the account's registered key compares to the local `runpodctl` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMatch {
    /// The keys match.
    Matches,
    /// The keys differ; pods will not accept the `runpodctl` key.
    Differs,
    /// No local `runpodctl` key to compare against.
    NoLocalKey,
}

impl Inventory {
    /// Creates a new inventory query helper.
    #[must_use]
    pub const fn new(client: RunPodClient) -> Self {
        Self { client }
    }

    /// Lists the network volumes on the account.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails or the response is malformed.
    pub async fn list_network_volumes(&self) -> Result<Vec<NetworkVolume>> {
        #[derive(Deserialize)]
        struct Response {
            myself: MyselfResponse,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct MyselfResponse {
            #[serde(default)]
            network_volumes: Option<Vec<NetworkVolume>>,
        }

        let query = r"
            query NetworkVolumes {
                myself {
                    networkVolumes {
                        id
                        name
                        size
                        dataCenterId
                    }
                }
            }
        ";

        info!("Listing network volumes");
        let response: Response = self.client.execute(query, None).await?;
        let volumes = response.myself.network_volumes.unwrap_or_default();

        debug!("Found {} network volumes", volumes.len());
        Ok(volumes)
    }

    /// Fetches the SSH public key registered on the account.
    ///
    /// Returns `None` when no key is registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails or the response is malformed.
    pub async fn fetch_public_key(&self) -> Result<Option<String>> {
        #[derive(Deserialize)]
        struct Response {
            myself: MyselfResponse,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct MyselfResponse {
            #[serde(default)]
            pub_key: Option<String>,
        }

        let query = r"
            query {
                myself {
                    pubKey
                }
            }
        ";

        info!("Fetching account SSH public key");
        let response: Response = self.client.execute(query, None).await?;

        Ok(response
            .myself
            .pub_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty()))
    }
}

/// Compares the account key with a local key. Either one containing the
/// other counts as a match, since the account field may hold several keys.
#[must_use]
pub fn compare_keys(account_key: &str, local_key: Option<&str>) -> KeyMatch {
    let Some(local) = local_key.map(str::trim) else {
        return KeyMatch::NoLocalKey;
    };
    let account = account_key.trim();

    if account.contains(local) || local.contains(account) {
        KeyMatch::Matches
    } else {
        KeyMatch::Differs
    }
}
