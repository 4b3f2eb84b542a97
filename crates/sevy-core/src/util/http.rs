use once_cell::sync::Lazy;
use reqwest::Client;
use std::time::Duration;

/// Global HTTP client, shared so upstream calls reuse pooled connections.
/// The overall timeout is generous because completion requests routinely
/// take tens of seconds.
static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(60))
        .connect_timeout(Duration::from_secs(5))
        .pool_idle_timeout(Duration::from_secs(90))
        .user_agent(concat!("sevy-gateway/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("Failed to create HTTP client")
});

/// Get the global HTTP client.
pub fn client() -> &'static Client {
    &HTTP_CLIENT
}
