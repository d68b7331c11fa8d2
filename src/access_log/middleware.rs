use super::config::{AccessLogConfig, LogLevel};
use super::writer::RotatingLogWriter;
use axum::{
    body::Body,
    extract::{ConnectInfo, Request},
    http::{Method, StatusCode, Version},
    response::Response,
};
use chrono::Local;
use futures::future::BoxFuture;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::Service;

/// Build the access log layer, or `None` when disabled
pub fn build_access_log_layer(
    config: &AccessLogConfig,
    writer: Option<Arc<RotatingLogWriter>>,
) -> Option<AccessLogLayer> {
    if !config.enabled {
        return None;
    }

    Some(AccessLogLayer {
        config: Arc::new(config.clone()),
        writer,
    })
}

/// Tower layer writing one line per completed request
///
/// Lines go to the rotating writer when one is attached; a structured
/// `tracing` event is emitted either way.
#[derive(Clone)]
pub struct AccessLogLayer {
    config: Arc<AccessLogConfig>,
    writer: Option<Arc<RotatingLogWriter>>,
}

impl<S> tower::Layer<S> for AccessLogLayer {
    type Service = AccessLogService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AccessLogService {
            inner,
            config: self.config.clone(),
            writer: self.writer.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AccessLogService<S> {
    inner: S,
    config: Arc<AccessLogConfig>,
    writer: Option<Arc<RotatingLogWriter>>,
}

impl<S> Service<Request> for AccessLogService<S>
where
    S: Service<Request, Response = Response<Body>> + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let config = self.config.clone();
        let writer = self.writer.clone();
        let start = Instant::now();

        let entry = AccessEntry {
            remote: req
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr),
            version: req.version(),
            method: req.method().clone(),
            uri: req.uri().to_string(),
        };

        let fut = self.inner.call(req);

        Box::pin(async move {
            let response = fut.await?;
            let status = response.status();
            let duration = start.elapsed();

            if let Some(mut writer) = writer.as_deref() {
                let line = entry.line(status, duration);
                if let Err(e) = writer.write_all(line.as_bytes()) {
                    tracing::error!(error = %e, "Failed to write access log line");
                }
            }

            emit_event(level_for(&config, status), &entry, status, duration);

            Ok(response)
        })
    }
}

struct AccessEntry {
    remote: Option<SocketAddr>,
    version: Version,
    method: Method,
    uri: String,
}

impl AccessEntry {
    /// `<date time> <remote> <protocol> <method> <uri> <status> <duration>\n`
    fn line(&self, status: StatusCode, duration: Duration) -> String {
        let remote = self
            .remote
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| "-".to_string());
        format!(
            "{} {} {:?} {} {} {} {:?}\n",
            Local::now().format("%Y/%m/%d %H:%M:%S"),
            remote,
            self.version,
            self.method,
            self.uri,
            status.as_u16(),
            duration
        )
    }
}

fn level_for(config: &AccessLogConfig, status: StatusCode) -> LogLevel {
    if status.is_server_error() {
        config.server_error_level
    } else if status.is_client_error() {
        config.client_error_level
    } else {
        config.success_level
    }
}

fn emit_event(level: LogLevel, entry: &AccessEntry, status: StatusCode, duration: Duration) {
    let remote = entry.remote.map(|addr| addr.to_string());
    macro_rules! access_event {
        ($level:ident) => {
            tracing::$level!(
                method = %entry.method,
                uri = %entry.uri,
                status = status.as_u16(),
                duration_ms = duration.as_millis(),
                remote = ?remote,
                "{} {} {}",
                entry.method,
                entry.uri,
                status.as_u16()
            )
        };
    }

    match level {
        LogLevel::Trace => access_event!(trace),
        LogLevel::Debug => access_event!(debug),
        LogLevel::Info => access_event!(info),
        LogLevel::Warn => access_event!(warn),
        LogLevel::Error => access_event!(error),
    }
}
