// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use crate::auth_scheme::{
    AuthSchemeId, AuthSchemeOption, AuthSchemePreference, AuthSchemeRegistry, SelectedScheme,
};
use crate::checksum::{validate_response, AwsChunkedEncoder, ChecksumAlgorithm, FlexibleChecksummer};
use crate::classify::{classify_error, classify_response, clock_skew, service_error, ResponseClass};
use crate::hash::hex_sha256;
use crate::retry::{RetryContext, RetryKind, RetryPolicy, StandardRetryPolicy};
use crate::{Context, Error, Identity, Result, STREAMING_UNSIGNED_PAYLOAD_TRAILER, UNSIGNED_PAYLOAD};
use bytes::Bytes;
use http::{HeaderMap, Method, Uri, Version};
use log::{debug, warn};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Whether the payload is part of the signature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PayloadSigning {
    /// Sign the hex SHA256 of the body.
    #[default]
    Signed,
    /// Sign the `UNSIGNED-PAYLOAD` sentinel.
    Unsigned,
    /// Send the body `aws-chunked` with an unsigned trailing checksum of this
    /// algorithm, signing `STREAMING-UNSIGNED-PAYLOAD-TRAILER`.
    StreamingUnsignedTrailer(ChecksumAlgorithm),
}

/// Operation is one API call handed to the [`Orchestrator`].
#[derive(Debug)]
pub struct Operation {
    request: http::Request<Bytes>,
    auth_options: Vec<AuthSchemeOption>,
    checksums: Vec<ChecksumAlgorithm>,
    content_md5: bool,
    payload_signing: PayloadSigning,
    validate_response_checksum: bool,
}

impl Operation {
    /// Create an operation with the auth scheme options it accepts, most
    /// preferred first.
    pub fn new(request: http::Request<Bytes>, auth_options: Vec<AuthSchemeOption>) -> Self {
        Self {
            request,
            auth_options,
            checksums: Vec::new(),
            content_md5: false,
            payload_signing: PayloadSigning::default(),
            validate_response_checksum: false,
        }
    }

    /// Request flexible checksums over the body.
    pub fn with_checksums(
        mut self,
        algorithms: impl IntoIterator<Item = ChecksumAlgorithm>,
    ) -> Self {
        self.checksums = algorithms.into_iter().collect();
        self
    }

    /// Require a `Content-MD5` header.
    pub fn with_content_md5(mut self) -> Self {
        self.content_md5 = true;
        self
    }

    /// Choose whether the payload is signed.
    pub fn with_payload_signing(mut self, payload_signing: PayloadSigning) -> Self {
        self.payload_signing = payload_signing;
        self
    }

    /// Verify a successful response body against its `x-amz-checksum-*`
    /// header. A mismatch fails the call.
    pub fn with_response_checksum_validation(mut self) -> Self {
        self.validate_response_checksum = true;
        self
    }
}

/// Everything needed to rebuild the request of an attempt.
struct Template {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
    checksummer: FlexibleChecksummer,
    payload_signing: PayloadSigning,
    validate_response_checksum: bool,
}

impl Template {
    fn new(op: Operation) -> (Self, Vec<AuthSchemeOption>) {
        let mut checksummer = FlexibleChecksummer::new(op.checksums);
        if op.content_md5 {
            checksummer = checksummer.with_content_md5();
        }
        let (parts, body) = op.request.into_parts();
        let template = Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            body,
            checksummer,
            payload_signing: op.payload_signing,
            validate_response_checksum: op.validate_response_checksum,
        };
        (template, op.auth_options)
    }

    fn parts(&self) -> http::request::Parts {
        let mut req = http::Request::new(());
        *req.method_mut() = self.method.clone();
        *req.uri_mut() = self.uri.clone();
        *req.version_mut() = self.version;
        *req.headers_mut() = self.headers.clone();
        req.into_parts().0
    }
}

enum State {
    ResolveScheme,
    ResolveIdentity(SelectedScheme),
    Sign(SelectedScheme, Option<Identity>),
    Transmit(SelectedScheme, http::Request<Bytes>),
    Classify(SelectedScheme, Result<http::Response<Bytes>>),
    Retry(SelectedScheme, RetryKind, Error),
    Done(Result<http::Response<Bytes>>),
}

impl State {
    fn name(&self) -> &'static str {
        match self {
            State::ResolveScheme => "ResolveScheme",
            State::ResolveIdentity(_) => "ResolveIdentity",
            State::Sign(..) => "Sign",
            State::Transmit(..) => "Transmit",
            State::Classify(..) => "Classify",
            State::Retry(..) => "Retry",
            State::Done(_) => "Done",
        }
    }
}

/// Orchestrator drives one API call from auth scheme selection to a final
/// response, retrying under its [`RetryPolicy`].
///
/// Every attempt rebuilds the request from the operation, recomputes
/// checksums and the payload hash, and signs again with a fresh clock reading.
/// A response rejecting the request time with a `Date` header far from ours
/// records the offset on the [`Context`] and is retried as transient.
#[derive(Clone)]
pub struct Orchestrator {
    ctx: Context,
    registry: AuthSchemeRegistry,
    retry: Arc<dyn RetryPolicy>,
    preference: AuthSchemePreference,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("ctx", &self.ctx)
            .field("registry", &self.registry)
            .field("retry", &self.retry)
            .field("preference", &self.preference)
            .finish()
    }
}

impl Orchestrator {
    /// Create an orchestrator with the standard retry policy.
    pub fn new(ctx: Context, registry: AuthSchemeRegistry) -> Self {
        Self {
            ctx,
            registry,
            retry: Arc::new(StandardRetryPolicy::default()),
            preference: AuthSchemePreference::default(),
        }
    }

    /// Use another retry policy.
    pub fn with_retry_policy(mut self, policy: impl RetryPolicy) -> Self {
        self.retry = Arc::new(policy);
        self
    }

    /// Share a retry policy, and its token bucket, with other orchestrators.
    pub fn with_shared_retry_policy(mut self, policy: Arc<dyn RetryPolicy>) -> Self {
        self.retry = policy;
        self
    }

    /// Reorder auth scheme options by this preference.
    pub fn with_auth_scheme_preference(mut self, preference: AuthSchemePreference) -> Self {
        self.preference = preference;
        self
    }

    /// The context requests are sent with.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Execute an operation.
    pub async fn execute(&self, op: Operation) -> Result<http::Response<Bytes>> {
        self.execute_with_context(op, None).await.0
    }

    /// Execute an operation that stops with [`crate::ErrorKind::Cancelled`]
    /// once `token` is cancelled.
    pub async fn execute_with_cancellation(
        &self,
        op: Operation,
        token: CancellationToken,
    ) -> Result<http::Response<Bytes>> {
        self.execute_with_context(op, Some(token)).await.0
    }

    /// Execute an operation and also return the retry context it ran with.
    pub async fn execute_with_context(
        &self,
        op: Operation,
        token: Option<CancellationToken>,
    ) -> (Result<http::Response<Bytes>>, RetryContext) {
        let (template, options) = Template::new(op);
        let mut rctx = RetryContext::new();
        let mut state = State::ResolveScheme;

        loop {
            if !matches!(state, State::Done(_)) && is_cancelled(token.as_ref()) {
                state = State::Done(Err(cancelled(&rctx)));
            }
            debug!(
                "orchestrator attempt {} entering {}",
                rctx.attempts(),
                state.name()
            );

            state = match state {
                State::ResolveScheme => match self.registry.select(&options, &self.preference) {
                    Ok(selected) => State::ResolveIdentity(selected),
                    Err(err) => State::Done(Err(err)),
                },
                State::ResolveIdentity(selected) => {
                    rctx.start_attempt();
                    if selected.option.scheme_id == AuthSchemeId::NO_AUTH {
                        State::Sign(selected, None)
                    } else {
                        match race(token.as_ref(), selected.scheme.resolve_identity(&self.ctx))
                            .await
                        {
                            None => State::Done(Err(cancelled(&rctx))),
                            Some(Ok(Some(identity))) => State::Sign(selected, Some(identity)),
                            Some(Ok(None)) => State::Done(Err(Error::credential_invalid(
                                format!(
                                    "no identity is available for auth scheme {}",
                                    selected.option.scheme_id
                                ),
                            )
                            .with_attempts(rctx.attempts()))),
                            Some(Err(err)) => {
                                State::Done(Err(err.with_attempts(rctx.attempts())))
                            }
                        }
                    }
                }
                State::Sign(selected, identity) => {
                    match self.sign(&template, &selected, identity.as_ref()).await {
                        Ok(req) => State::Transmit(selected, req),
                        Err(err) => State::Done(Err(err.with_attempts(rctx.attempts()))),
                    }
                }
                State::Transmit(selected, req) => {
                    match race(token.as_ref(), self.ctx.http_send(req)).await {
                        None => State::Done(Err(cancelled(&rctx))),
                        Some(res) => State::Classify(selected, res),
                    }
                }
                State::Classify(selected, res) => match res {
                    Ok(resp) if self.correct_clock_skew(&resp) => State::Retry(
                        selected,
                        RetryKind::Transient,
                        service_error(&resp),
                    ),
                    Ok(resp) => match classify_response(&resp) {
                        ResponseClass::Success if template.validate_response_checksum => {
                            match validate_response(&resp).await {
                                Ok(validation) => {
                                    debug!("response checksum: {validation:?}");
                                    self.retry.on_success(&rctx);
                                    State::Done(Ok(resp))
                                }
                                Err(err) => {
                                    rctx.record_failure(&err);
                                    State::Done(Err(err.with_attempts(rctx.attempts())))
                                }
                            }
                        }
                        ResponseClass::Success => {
                            self.retry.on_success(&rctx);
                            State::Done(Ok(resp))
                        }
                        ResponseClass::Retry(kind) => {
                            State::Retry(selected, kind, service_error(&resp))
                        }
                        ResponseClass::Terminal => {
                            let err = service_error(&resp);
                            rctx.record_failure(&err);
                            State::Done(Err(err.with_attempts(rctx.attempts())))
                        }
                    },
                    Err(err) => match classify_error(&err) {
                        Some(kind) => State::Retry(selected, kind, err),
                        None => {
                            rctx.record_failure(&err);
                            State::Done(Err(err.with_attempts(rctx.attempts())))
                        }
                    },
                },
                State::Retry(selected, kind, err) => {
                    rctx.record_failure(&err);
                    if rctx.attempts() >= self.retry.max_attempts()
                        || !self.retry.should_retry(&mut rctx, kind)
                    {
                        debug!("request will not be retried, retries have been exhausted");
                        State::Done(Err(err.with_attempts(rctx.attempts())))
                    } else {
                        let delay = self.retry.backoff_delay(rctx.attempts(), kind);
                        debug!(
                            "attempt {} failed with {kind:?} error, retrying in {}ms: {err}",
                            rctx.attempts(),
                            delay.as_millis()
                        );
                        match race(token.as_ref(), tokio::time::sleep(delay)).await {
                            None => State::Done(Err(cancelled(&rctx))),
                            Some(()) => State::ResolveIdentity(selected),
                        }
                    }
                }
                State::Done(res) => return (res, rctx),
            };
        }
    }

    /// Record the server's clock offset when `resp` failed because of it.
    fn correct_clock_skew(&self, resp: &http::Response<Bytes>) -> bool {
        let Some(delta) = clock_skew(resp, self.ctx.now()) else {
            return false;
        };
        let skew = self.ctx.clock_skew() + delta;
        warn!(
            "request time rejected with {}, adjusting clock skew to {}s",
            resp.status(),
            skew.num_seconds()
        );
        self.ctx.set_clock_skew(skew);
        true
    }

    async fn sign(
        &self,
        template: &Template,
        selected: &SelectedScheme,
        identity: Option<&Identity>,
    ) -> Result<http::Request<Bytes>> {
        let mut parts = template.parts();
        template.checksummer.apply(&mut parts, &template.body)?;

        let (body, payload_hash) = match template.payload_signing {
            PayloadSigning::Signed => (template.body.clone(), hex_sha256(&template.body)),
            PayloadSigning::Unsigned => (template.body.clone(), UNSIGNED_PAYLOAD.to_string()),
            PayloadSigning::StreamingUnsignedTrailer(algorithm) => (
                AwsChunkedEncoder::new(algorithm).encode(&mut parts, &template.body)?,
                STREAMING_UNSIGNED_PAYLOAD_TRAILER.to_string(),
            ),
        };

        if selected.option.scheme_id != AuthSchemeId::NO_AUTH {
            let mut properties = selected.option.properties.clone();
            if properties.payload_hash.is_none() {
                properties.payload_hash = Some(payload_hash);
            }
            selected
                .scheme
                .sign(&self.ctx, &mut parts, identity, &properties)
                .await?;
        }

        Ok(http::Request::from_parts(parts, body))
    }
}

fn is_cancelled(token: Option<&CancellationToken>) -> bool {
    token.is_some_and(|t| t.is_cancelled())
}

fn cancelled(rctx: &RetryContext) -> Error {
    Error::cancelled("operation was cancelled").with_attempts(rctx.attempts())
}

/// Run `fut` unless `token` is cancelled first.
async fn race<F: Future>(token: Option<&CancellationToken>, fut: F) -> Option<F::Output> {
    match token {
        None => Some(fut.await),
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => None,
                v = fut => Some(v),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth_scheme::HttpAuthScheme;
    use crate::retry::{Backoff, NoRetryPolicy, RetryConfig};
    use crate::time::{format_iso8601, parse_rfc3339, FixedClock};
    use crate::{
        ErrorKind, HttpSend, ProvideCredential, SignRequest, SigningCredential,
        SigningProperties,
    };
    use async_trait::async_trait;
    use http::header::AUTHORIZATION;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Clone)]
    enum Reply {
        Status(u16, &'static str),
        WithHeaders(u16, &'static [(&'static str, &'static str)], &'static str),
        Reset,
        Hang,
    }

    #[derive(Debug, Default)]
    struct Wire {
        replies: Mutex<VecDeque<Reply>>,
        seen: Mutex<Vec<http::Request<Bytes>>>,
    }

    #[derive(Debug, Clone, Default)]
    struct ScriptedHttp(Arc<Wire>);

    impl ScriptedHttp {
        fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
            let wire = Wire::default();
            wire.replies.lock().unwrap().extend(replies);
            Self(Arc::new(wire))
        }

        fn seen(&self) -> Vec<http::Request<Bytes>> {
            let seen = self.0.seen.lock().unwrap();
            seen.iter()
                .map(|r| {
                    let mut c = http::Request::new(r.body().clone());
                    *c.uri_mut() = r.uri().clone();
                    *c.headers_mut() = r.headers().clone();
                    c
                })
                .collect()
        }
    }

    #[async_trait]
    impl HttpSend for ScriptedHttp {
        async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
            self.0.seen.lock().unwrap().push(req);
            let reply = self
                .0
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Reply::Status(200, ""));
            match reply {
                Reply::Status(status, body) => Ok(http::Response::builder()
                    .status(status)
                    .body(Bytes::from_static(body.as_bytes()))
                    .unwrap()),
                Reply::WithHeaders(status, headers, body) => {
                    let mut b = http::Response::builder().status(status);
                    for (k, v) in headers {
                        b = b.header(*k, *v);
                    }
                    Ok(b.body(Bytes::from_static(body.as_bytes())).unwrap())
                }
                Reply::Reset => Err(Error::transport("connection reset by peer")),
                Reply::Hang => std::future::pending().await,
            }
        }
    }

    #[derive(Clone, Debug)]
    struct Key(String);

    impl SigningCredential for Key {
        fn is_valid(&self) -> bool {
            true
        }
    }

    #[derive(Debug)]
    struct KeyProvider(Option<&'static str>);

    #[async_trait]
    impl ProvideCredential for KeyProvider {
        type Credential = Key;

        async fn provide_credential(&self, _: &Context) -> Result<Option<Key>> {
            Ok(self.0.map(|k| Key(k.to_string())))
        }
    }

    /// Writes `<key> <n> <payload hash> <signed checksum headers>` and stamps
    /// `x-amz-date` from the context clock.
    #[derive(Debug, Default)]
    struct CountingSigner(AtomicUsize);

    #[async_trait]
    impl SignRequest for CountingSigner {
        type Credential = Key;

        async fn sign_request(
            &self,
            ctx: &Context,
            req: &mut http::request::Parts,
            credential: Option<&Key>,
            properties: &SigningProperties,
        ) -> Result<()> {
            let key = credential.ok_or_else(|| Error::credential_invalid("missing key"))?;
            let n = self.0.fetch_add(1, Ordering::SeqCst) + 1;
            let mut checksums: Vec<&str> = req
                .headers
                .keys()
                .map(|k| k.as_str())
                .filter(|k| k.starts_with("x-amz-checksum-"))
                .collect();
            checksums.sort();
            let value = format!(
                "{} {n} {} {}",
                key.0,
                properties.payload_hash.as_deref().unwrap_or("-"),
                checksums.join(";")
            );
            req.headers.insert(AUTHORIZATION, value.parse()?);
            req.headers
                .insert("x-amz-date", format_iso8601(ctx.now()).parse()?);
            Ok(())
        }
    }

    const TEST_SCHEME: AuthSchemeId = AuthSchemeId::SIGV4;

    fn orchestrator(http: &ScriptedHttp, key: Option<&'static str>) -> Orchestrator {
        orchestrator_with_context(Context::new().with_http_send(http.clone()), key)
    }

    fn orchestrator_with_context(ctx: Context, key: Option<&'static str>) -> Orchestrator {
        let _ = env_logger::builder().is_test(true).try_init();

        let registry = AuthSchemeRegistry::new().register(HttpAuthScheme::new(
            TEST_SCHEME,
            KeyProvider(key),
            CountingSigner::default(),
        ));
        Orchestrator::new(ctx, registry).with_retry_policy(
            StandardRetryPolicy::new(RetryConfig {
                max_attempts: 3,
                backoff: Backoff::None,
                token_bucket: true,
            })
            .unwrap(),
        )
    }

    fn operation(body: &'static str) -> Operation {
        let req = http::Request::put("https://example.amazonaws.com/object")
            .body(Bytes::from_static(body.as_bytes()))
            .unwrap();
        Operation::new(
            req,
            vec![AuthSchemeOption::new(TEST_SCHEME, SigningProperties::default())],
        )
    }

    fn authorization(req: &http::Request<Bytes>) -> String {
        req.headers()[AUTHORIZATION].to_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_success_first_attempt() -> Result<()> {
        let http = ScriptedHttp::new([Reply::Status(200, "ok")]);
        let (res, rctx) = orchestrator(&http, Some("ak"))
            .execute_with_context(operation(""), None)
            .await;

        assert_eq!(res?.body().as_ref(), b"ok");
        assert_eq!(rctx.attempts(), 1);
        assert_eq!(
            authorization(&http.seen()[0]),
            "ak 1 e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855 "
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_retry_resigns_each_attempt() -> Result<()> {
        let http = ScriptedHttp::new([
            Reply::Status(503, ""),
            Reply::Reset,
            Reply::Status(200, ""),
        ]);
        let op = operation("Hello world").with_checksums([ChecksumAlgorithm::Crc32]);
        let (res, rctx) = orchestrator(&http, Some("ak"))
            .execute_with_context(op, None)
            .await;

        res?;
        assert_eq!(rctx.attempts(), 3);
        let seen = http.seen();
        assert_eq!(seen.len(), 3);
        for (i, req) in seen.iter().enumerate() {
            assert_eq!(req.body().as_ref(), b"Hello world");
            assert_eq!(req.headers()["x-amz-checksum-crc32"], "i9aeUg==");
            assert_eq!(
                authorization(req),
                format!(
                    "ak {} 64ec88ca00b268e5ba1a35678a1b5316d212f4f366b2477232534a8aeca37f3c x-amz-checksum-crc32",
                    i + 1
                )
            );
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_exhaustion_reports_attempts() {
        let http = ScriptedHttp::new([
            Reply::Status(500, ""),
            Reply::Status(502, ""),
            Reply::Status(503, "<Error><Code>ServiceUnavailable</Code></Error>"),
            Reply::Status(200, ""),
        ]);
        let (res, rctx) = orchestrator(&http, Some("ak"))
            .execute_with_context(operation(""), None)
            .await;

        let err = res.expect_err("must exhaust retries");
        assert_eq!(err.kind(), ErrorKind::Service);
        assert_eq!(err.attempts(), Some(3));
        assert_eq!(err.status(), Some(http::StatusCode::SERVICE_UNAVAILABLE));
        assert!(err.message().contains("ServiceUnavailable"));
        assert_eq!(rctx.attempts(), 3);
        assert_eq!(rctx.last_status(), Some(http::StatusCode::SERVICE_UNAVAILABLE));
        assert_eq!(http.seen().len(), 3);
    }

    #[tokio::test]
    async fn test_terminal_status_not_retried() {
        let http = ScriptedHttp::new([Reply::Status(
            400,
            r#"{"__type":"ValidationException","message":"bad"}"#,
        )]);
        let err = orchestrator(&http, Some("ak"))
            .execute(operation(""))
            .await
            .expect_err("must fail");

        assert_eq!(err.kind(), ErrorKind::Service);
        assert_eq!(err.attempts(), Some(1));
        assert_eq!(http.seen().len(), 1);
    }

    #[tokio::test]
    async fn test_throttling_is_retried() -> Result<()> {
        let http = ScriptedHttp::new([
            Reply::Status(400, r#"{"__type":"ThrottlingException"}"#),
            Reply::Status(200, ""),
        ]);
        let (res, rctx) = orchestrator(&http, Some("ak"))
            .execute_with_context(operation(""), None)
            .await;
        res?;
        assert_eq!(rctx.attempts(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_identity_is_terminal() {
        let http = ScriptedHttp::new([]);
        let err = orchestrator(&http, None)
            .execute(operation(""))
            .await
            .expect_err("must fail");

        assert_eq!(err.kind(), ErrorKind::CredentialInvalid);
        assert!(http.seen().is_empty());
    }

    #[tokio::test]
    async fn test_no_auth_skips_signing() -> Result<()> {
        let http = ScriptedHttp::new([]);
        let req = http::Request::get("https://example.amazonaws.com/")
            .body(Bytes::new())
            .unwrap();
        let op = Operation::new(req, vec![AuthSchemeOption::no_auth()]);
        orchestrator(&http, None).execute(op).await?;

        assert!(!http.seen()[0].headers().contains_key(AUTHORIZATION));
        Ok(())
    }

    #[tokio::test]
    async fn test_unsigned_payload() -> Result<()> {
        let http = ScriptedHttp::new([]);
        let op = operation("data").with_payload_signing(PayloadSigning::Unsigned);
        orchestrator(&http, Some("ak")).execute(op).await?;

        assert_eq!(authorization(&http.seen()[0]), "ak 1 UNSIGNED-PAYLOAD ");
        Ok(())
    }

    #[tokio::test]
    async fn test_content_md5_is_sent_and_signed() -> Result<()> {
        let http = ScriptedHttp::new([Reply::Status(500, ""), Reply::Status(200, "")]);
        let op = operation("").with_content_md5();
        orchestrator(&http, Some("ak")).execute(op).await?;

        let seen = http.seen();
        assert_eq!(seen.len(), 2);
        for req in &seen {
            assert_eq!(req.headers()["content-md5"], "1B2M2Y8AsgTpgAmY7PhCfg==");
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_streaming_unsigned_trailer() -> Result<()> {
        let http = ScriptedHttp::new([Reply::Status(503, ""), Reply::Status(200, "")]);
        let op = operation("Hello world").with_payload_signing(
            PayloadSigning::StreamingUnsignedTrailer(ChecksumAlgorithm::Crc32),
        );
        orchestrator(&http, Some("ak")).execute(op).await?;

        let seen = http.seen();
        assert_eq!(seen.len(), 2);
        for (i, req) in seen.iter().enumerate() {
            assert_eq!(
                String::from_utf8_lossy(req.body()),
                "b\r\nHello world\r\n0\r\nx-amz-checksum-crc32:i9aeUg==\r\n\r\n"
            );
            assert_eq!(req.headers()["content-encoding"], "aws-chunked");
            assert_eq!(req.headers()["x-amz-decoded-content-length"], "11");
            assert_eq!(req.headers()["x-amz-trailer"], "x-amz-checksum-crc32");
            assert_eq!(
                req.headers()["content-length"],
                req.body().len().to_string().as_str()
            );
            assert_eq!(
                authorization(req),
                format!("ak {} STREAMING-UNSIGNED-PAYLOAD-TRAILER ", i + 1)
            );
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_response_checksum_validation() -> Result<()> {
        let http = ScriptedHttp::new([
            Reply::WithHeaders(200, &[("x-amz-checksum-crc32", "i9aeUg==")], "Hello world"),
            Reply::WithHeaders(200, &[("x-amz-checksum-crc32", "i9aeUg=")], "Hello world"),
        ]);
        let o = orchestrator(&http, Some("ak"));

        let get = || operation("").with_response_checksum_validation();
        assert_eq!(o.execute(get()).await?.body().as_ref(), b"Hello world");

        let err = o.execute(get()).await.expect_err("mismatch must fail");
        assert_eq!(err.kind(), ErrorKind::Unexpected);
        assert_eq!(err.attempts(), Some(1));
        assert!(err.message().contains("different checksum"));

        // Without validation the same body passes through.
        let http = ScriptedHttp::new([Reply::WithHeaders(
            200,
            &[("x-amz-checksum-crc32", "i9aeUg=")],
            "Hello world",
        )]);
        orchestrator(&http, Some("ak")).execute(operation("")).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_clock_skew_is_corrected_and_retried() -> Result<()> {
        let http = ScriptedHttp::new([
            Reply::WithHeaders(
                403,
                &[("date", "Mon, 01 Jan 2024 12:20:00 GMT")],
                "<Error><Code>RequestTimeTooSkewed</Code></Error>",
            ),
            Reply::Status(200, ""),
        ]);
        let ctx = Context::new()
            .with_http_send(http.clone())
            .with_clock(FixedClock(parse_rfc3339("2024-01-01T12:00:00Z")?));
        let o = orchestrator_with_context(ctx, Some("ak"));
        let (res, rctx) = o.execute_with_context(operation(""), None).await;

        res?;
        assert_eq!(rctx.attempts(), 2);
        let seen = http.seen();
        assert_eq!(seen[0].headers()["x-amz-date"], "20240101T120000Z");
        assert_eq!(seen[1].headers()["x-amz-date"], "20240101T122000Z");
        assert_eq!(o.context().clock_skew(), chrono::TimeDelta::minutes(20));

        // The offset sticks for later calls.
        o.execute(operation("")).await?;
        assert_eq!(http.seen()[2].headers()["x-amz-date"], "20240101T122000Z");
        Ok(())
    }

    #[tokio::test]
    async fn test_signature_mismatch_without_skew_is_terminal() {
        let http = ScriptedHttp::new([Reply::WithHeaders(
            403,
            &[("date", "Mon, 01 Jan 2024 12:00:30 GMT")],
            "<Error><Code>SignatureDoesNotMatch</Code></Error>",
        )]);
        let ctx = Context::new()
            .with_http_send(http.clone())
            .with_clock(FixedClock(
                parse_rfc3339("2024-01-01T12:00:00Z").expect("time must be valid"),
            ));
        let err = orchestrator_with_context(ctx, Some("ak"))
            .execute(operation(""))
            .await
            .expect_err("must fail");

        assert_eq!(err.status(), Some(http::StatusCode::FORBIDDEN));
        assert_eq!(err.attempts(), Some(1));
    }

    #[tokio::test]
    async fn test_unresolvable_scheme() {
        let http = ScriptedHttp::new([]);
        let req = http::Request::get("https://example.amazonaws.com/")
            .body(Bytes::new())
            .unwrap();
        let op = Operation::new(
            req,
            vec![AuthSchemeOption::new(
                AuthSchemeId::BEARER,
                SigningProperties::default(),
            )],
        );
        let err = orchestrator(&http, Some("ak"))
            .execute(op)
            .await
            .expect_err("must fail");
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert!(err.message().contains("no auth scheme could be resolved"));
    }

    #[tokio::test]
    async fn test_no_retry_policy() {
        let http = ScriptedHttp::new([Reply::Reset, Reply::Status(200, "")]);
        let err = orchestrator(&http, Some("ak"))
            .with_retry_policy(NoRetryPolicy)
            .execute(operation(""))
            .await
            .expect_err("must fail");
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(err.attempts(), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_transport() {
        let http = ScriptedHttp::new([Reply::Hang]);
        let token = CancellationToken::new();
        let o = orchestrator(&http, Some("ak"));

        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                token.cancel();
            })
        };
        let err = o
            .execute_with_cancellation(operation(""), token)
            .await
            .expect_err("must be cancelled");
        canceller.await.unwrap();

        assert!(err.is_cancelled());
        assert_eq!(err.attempts(), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff() {
        let http = ScriptedHttp::new([Reply::Status(503, "")]);
        let token = CancellationToken::new();
        let o = orchestrator(&http, Some("ak")).with_retry_policy(
            StandardRetryPolicy::new(RetryConfig {
                max_attempts: 3,
                backoff: Backoff::Fixed(Duration::from_secs(60)),
                token_bucket: false,
            })
            .unwrap(),
        );

        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                token.cancel();
            })
        };
        let err = o
            .execute_with_cancellation(operation(""), token)
            .await
            .expect_err("must be cancelled");
        canceller.await.unwrap();

        assert!(err.is_cancelled());
        assert_eq!(http.seen().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let http = ScriptedHttp::new([]);
        let token = CancellationToken::new();
        token.cancel();
        let err = orchestrator(&http, Some("ak"))
            .execute_with_cancellation(operation(""), token)
            .await
            .expect_err("must be cancelled");
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(http.seen().is_empty());
    }
}
