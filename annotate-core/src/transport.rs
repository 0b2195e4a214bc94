//! Persistence transports.
//!
//! Each of the three operations (load, save, delete) may be configured as a
//! URL or as a handler. [`normalize_api`] turns both forms into handlers so
//! the overlay only ever calls functions:
//!
//! ```text
//! Endpoint::Url("…")     ──► HTTP GET/POST JSON ─┐
//! Endpoint::Handler(f)   ──────────────────────── ├──► NormalizedApi
//! NoteStore (trait)      ──► ApiConfig::from_store┘
//! ```
//!
//! A transport signals failure only by resolving to `Err`. Responses are
//! trusted as-is beyond JSON decoding.

use std::fmt;
use std::future::Future;
use std::rc::Rc;

use async_trait::async_trait;
use futures::future::{FutureExt, LocalBoxFuture};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{OperationKind, TransportError};
use crate::note::{Annotation, NoteData, SaveResult};

/// Future returned by every transport handler.
pub type TransportFuture<T> = LocalBoxFuture<'static, Result<T, TransportError>>;

/// Fetches the annotation list.
pub type LoadHandler = Rc<dyn Fn() -> TransportFuture<Vec<Annotation>>>;

/// Persists one annotation.
pub type SaveHandler = Rc<dyn Fn(NoteData) -> TransportFuture<SaveResult>>;

/// Removes one annotation.
pub type DeleteHandler = Rc<dyn Fn(NoteData) -> TransportFuture<()>>;

/// One configured operation: either an endpoint URL or a handler.
#[derive(Clone)]
pub enum Endpoint<F> {
    /// HTTP endpoint, absolute or relative to [`ApiConfig::base_url`].
    Url(String),
    /// Caller-supplied handler.
    Handler(F),
}

impl<F> fmt::Debug for Endpoint<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => f.debug_tuple("Url").field(url).finish(),
            Self::Handler(_) => f.write_str("Handler(..)"),
        }
    }
}

/// Persistence configuration. Every operation is optional; an absent one
/// is handled locally.
#[derive(Debug, Clone, Default)]
pub struct ApiConfig {
    /// Load operation.
    pub load: Option<Endpoint<LoadHandler>>,
    /// Save operation.
    pub save: Option<Endpoint<SaveHandler>>,
    /// Delete operation.
    pub delete: Option<Endpoint<DeleteHandler>>,
    /// Base for resolving relative URLs.
    pub base_url: Option<Url>,
}

impl ApiConfig {
    /// Load from `url` with `GET`.
    #[must_use]
    pub fn load_url(mut self, url: impl Into<String>) -> Self {
        self.load = Some(Endpoint::Url(url.into()));
        self
    }

    /// Save to `url` with a JSON `POST`.
    #[must_use]
    pub fn save_url(mut self, url: impl Into<String>) -> Self {
        self.save = Some(Endpoint::Url(url.into()));
        self
    }

    /// Delete through `url` with a JSON `POST`.
    #[must_use]
    pub fn delete_url(mut self, url: impl Into<String>) -> Self {
        self.delete = Some(Endpoint::Url(url.into()));
        self
    }

    /// Resolve relative URLs against `base`.
    #[must_use]
    pub fn with_base_url(mut self, base: Url) -> Self {
        self.base_url = Some(base);
        self
    }

    /// Load with a custom handler.
    #[must_use]
    pub fn load_with<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = Result<Vec<Annotation>, TransportError>> + 'static,
    {
        self.load = Some(Endpoint::Handler(Rc::new(move || f().boxed_local())));
        self
    }

    /// Save with a custom handler.
    #[must_use]
    pub fn save_with<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(NoteData) -> Fut + 'static,
        Fut: Future<Output = Result<SaveResult, TransportError>> + 'static,
    {
        self.save = Some(Endpoint::Handler(Rc::new(move |note| f(note).boxed_local())));
        self
    }

    /// Delete with a custom handler.
    #[must_use]
    pub fn delete_with<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(NoteData) -> Fut + 'static,
        Fut: Future<Output = Result<(), TransportError>> + 'static,
    {
        self.delete = Some(Endpoint::Handler(Rc::new(move |note| f(note).boxed_local())));
        self
    }

    /// Route all three operations to `store`.
    #[must_use]
    pub fn from_store<S: NoteStore + 'static>(store: Rc<S>) -> Self {
        let loader = Rc::clone(&store);
        let saver = Rc::clone(&store);
        Self::default()
            .load_with(move || {
                let store = Rc::clone(&loader);
                async move { store.load().await }
            })
            .save_with(move |note| {
                let store = Rc::clone(&saver);
                async move { store.save(note).await }
            })
            .delete_with(move |note| {
                let store = Rc::clone(&store);
                async move { store.delete(note).await }
            })
    }
}

/// A persistence backend.
#[async_trait(?Send)]
pub trait NoteStore {
    /// Fetch every annotation.
    async fn load(&self) -> Result<Vec<Annotation>, TransportError>;

    /// Persist one annotation, optionally assigning its id.
    async fn save(&self, note: NoteData) -> Result<SaveResult, TransportError>;

    /// Remove one annotation.
    async fn delete(&self, note: NoteData) -> Result<(), TransportError>;
}

/// Transports with every configured operation turned into a handler.
#[derive(Clone, Default)]
pub struct NormalizedApi {
    /// Load handler.
    pub load: Option<LoadHandler>,
    /// Save handler.
    pub save: Option<SaveHandler>,
    /// Delete handler.
    pub delete: Option<DeleteHandler>,
}

impl fmt::Debug for NormalizedApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NormalizedApi")
            .field("load", &self.load.is_some())
            .field("save", &self.save.is_some())
            .field("delete", &self.delete.is_some())
            .finish()
    }
}

/// Turn URL endpoints into HTTP handlers.
///
/// One HTTP client is shared by every URL endpoint and is only built when
/// at least one endpoint is a URL.
///
/// # Errors
///
/// Returns [`TransportError::Client`] if the HTTP client cannot be built.
pub fn normalize_api(api: ApiConfig) -> Result<NormalizedApi, TransportError> {
    let needs_client = matches!(api.load, Some(Endpoint::Url(_)))
        || matches!(api.save, Some(Endpoint::Url(_)))
        || matches!(api.delete, Some(Endpoint::Url(_)));
    let client = if needs_client {
        Some(Client::builder().build().map_err(TransportError::Client)?)
    } else {
        None
    };
    let http = |url: String, operation: OperationKind| {
        client.clone().map(|client| HttpEndpoint {
            client,
            url,
            base: api.base_url.clone(),
            operation,
        })
    };

    let load: Option<LoadHandler> = match api.load {
        Some(Endpoint::Handler(f)) => Some(f),
        Some(Endpoint::Url(url)) => http(url, OperationKind::Load).map(|endpoint| {
            let handler: LoadHandler = Rc::new(move || endpoint.clone().get_json().boxed_local());
            handler
        }),
        None => None,
    };
    let save: Option<SaveHandler> = match api.save {
        Some(Endpoint::Handler(f)) => Some(f),
        Some(Endpoint::Url(url)) => http(url, OperationKind::Save).map(|endpoint| {
            let handler: SaveHandler =
                Rc::new(move |note| endpoint.clone().post_json(note).boxed_local());
            handler
        }),
        None => None,
    };
    let delete: Option<DeleteHandler> = match api.delete {
        Some(Endpoint::Handler(f)) => Some(f),
        Some(Endpoint::Url(url)) => http(url, OperationKind::Delete).map(|endpoint| {
            let handler: DeleteHandler =
                Rc::new(move |note| endpoint.clone().post(note).boxed_local());
            handler
        }),
        None => None,
    };

    tracing::debug!(
        load = load.is_some(),
        save = save.is_some(),
        delete = delete.is_some(),
        "Normalized annotation transports"
    );
    Ok(NormalizedApi { load, save, delete })
}

#[derive(Debug, Clone)]
struct HttpEndpoint {
    client: Client,
    url: String,
    base: Option<Url>,
    operation: OperationKind,
}

impl HttpEndpoint {
    fn resolve(&self) -> Result<Url, TransportError> {
        let parsed = match &self.base {
            Some(base) => base.join(&self.url),
            None => Url::parse(&self.url),
        };
        parsed.map_err(|source| TransportError::InvalidUrl {
            url: self.url.clone(),
            source,
        })
    }

    fn check(&self, response: Response) -> Result<Response, TransportError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(TransportError::Status {
                operation: self.operation,
                status: status.as_u16(),
            })
        }
    }

    async fn get_json<T: DeserializeOwned>(self) -> Result<T, TransportError> {
        let url = self.resolve()?;
        tracing::debug!(%url, operation = %self.operation, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| TransportError::Request {
                operation: self.operation,
                source,
            })?;
        self.check(response)?
            .json()
            .await
            .map_err(|source| TransportError::Decode {
                operation: self.operation,
                source,
            })
    }

    async fn send(&self, note: &NoteData) -> Result<Response, TransportError> {
        let url = self.resolve()?;
        tracing::debug!(%url, operation = %self.operation, id = %note.id, "POST");
        let response = self
            .client
            .post(url)
            .json(note)
            .send()
            .await
            .map_err(|source| TransportError::Request {
                operation: self.operation,
                source,
            })?;
        self.check(response)
    }

    async fn post_json<T: DeserializeOwned>(self, note: NoteData) -> Result<T, TransportError> {
        self.send(&note)
            .await?
            .json()
            .await
            .map_err(|source| TransportError::Decode {
                operation: self.operation,
                source,
            })
    }

    async fn post(self, note: NoteData) -> Result<(), TransportError> {
        self.send(&note).await.map(drop)
    }
}
