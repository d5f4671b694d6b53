use core::future::Future;
use core::pin::Pin;

use reqwest::Client;
use reqwest::redirect::Policy;

use crate::config::{ClientConfig, bounded};
use crate::error::{Error, Result};
use crate::transport::{
    AsyncTransport, CONTENT_TYPE, HttpRequest, HttpResponse, TlsSetup, USER_AGENT, build_error,
    location_of, map_reqwest_error, tls_setup,
};

/// Tokio HTTP(S) transport backed by a pooled reqwest client.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Build a client from connection settings.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .redirect(Policy::none())
            .user_agent(USER_AGENT)
            .connect_timeout(bounded(config.connect_timeout))
            .pool_max_idle_per_host(config.connection_pool_size);

        builder = match tls_setup(config)? {
            TlsSetup::Default => builder,
            TlsSetup::Root(cert) => builder.add_root_certificate(cert),
            TlsSetup::AcceptInvalid => builder.danger_accept_invalid_certs(true),
        };

        let client = builder.build().map_err(build_error)?;
        Ok(Self { client })
    }

    async fn send_recv_impl(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let exchange = async {
            let response = self
                .client
                .post(request.url.clone())
                .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
                .timeout(request.timeout)
                .body(request.body.clone())
                .send()
                .await
                .map_err(|e| map_reqwest_error(e, &request.method))?;

            let status = response.status().as_u16();
            let location = location_of(response.headers());
            let body = response
                .bytes()
                .await
                .map_err(|e| map_reqwest_error(e, &request.method))?;

            Ok(HttpResponse {
                status,
                location,
                body: body.to_vec(),
            })
        };

        // Dropping the in-flight future on expiry closes its connection.
        match tokio::time::timeout(request.timeout, exchange).await {
            Ok(result) => result,
            Err(_elapsed) => Err(Error::Timeout {
                method: request.method.clone(),
            }),
        }
    }
}

impl AsyncTransport for HttpTransport {
    fn send_recv<'a>(
        &'a self,
        request: &'a HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse>> + Send + 'a>> {
        Box::pin(async move { self.send_recv_impl(request).await })
    }
}
