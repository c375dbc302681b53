#![doc = "Dialogflow CX client for the CLI: implements the core `AgentClient` contract over the v3 REST API."]
//
//! # Agent client (CLI <-> Core)
//!
//! [`DialogflowClient`] is the networked implementation of
//! [`vf_dfcx_core::contract::AgentClient`]. It speaks JSON over HTTPS to the regional
//! Dialogflow endpoint and authenticates every call with a bearer token obtained once at
//! construction (see [`crate::auth`]).
//!
//! - List calls follow `nextPageToken` until the collection is exhausted.
//! - Non-2xx responses become errors carrying the status and the response body.
//! - `languageCode` is sent on every call when configured, so training phrases and
//!   entities land in that language instead of the agent default.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, info};

use vf_dfcx_core::contract::{AgentClient, ClientError};
use vf_dfcx_core::remote::{
    EntityType, Intent, ListEntityTypesResponse, ListIntentsResponse, ListPagesResponse, Page,
};

use crate::auth::resolve_access_token;
use crate::load_config::ClientConfig;

/// Largest page size the list endpoints accept.
pub const PAGE_SIZE: u32 = 1000;

pub struct DialogflowClient {
    http: Client,
    base_url: String,
    agent: String,
    access_token: String,
    language_code: Option<String>,
}

impl DialogflowClient {
    pub fn new(
        base_url: impl Into<String>,
        agent: impl Into<String>,
        access_token: impl Into<String>,
        language_code: Option<String>,
    ) -> Self {
        DialogflowClient {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            agent: agent.into(),
            access_token: access_token.into(),
            language_code,
        }
    }

    /// Resolves credentials and builds a client for `agent`.
    pub async fn connect(config: &ClientConfig, agent: &str) -> anyhow::Result<Self> {
        let mut client = DialogflowClient::new(
            config.base_url.clone(),
            agent,
            String::new(),
            config.language_code.clone(),
        );
        client.access_token = resolve_access_token(&client.http, &config.credentials).await?;
        info!(
            base_url = %client.base_url,
            agent,
            "Initialized DialogflowClient"
        );
        Ok(client)
    }

    fn collection_url(&self, parent: &str, collection: &str) -> String {
        format!("{}/v3/{}/{}", self.base_url, parent, collection)
    }

    fn with_language(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.language_code {
            Some(language_code) => request.query(&[("languageCode", language_code)]),
            None => request,
        }
    }

    async fn send<R: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        url: &str,
    ) -> Result<R, ClientError> {
        let response = request.bearer_auth(&self.access_token).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<Failed to decode response body>"));
            error!(status = %status, url, "Dialogflow API returned error. Response body: {body}");
            return Err(format!("Dialogflow API returned {status} for {url}: {body}").into());
        }
        Ok(response.json::<R>().await?)
    }

    async fn list_all<R, T>(
        &self,
        parent: &str,
        collection: &str,
        into_page: impl Fn(R) -> (Vec<T>, Option<String>),
    ) -> Result<Vec<T>, ClientError>
    where
        R: DeserializeOwned,
    {
        let url = self.collection_url(parent, collection);
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.http.get(&url).query(&[("pageSize", PAGE_SIZE)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }
            let response: R = self.send(self.with_language(request), &url).await?;
            let (batch, next_page_token) = into_page(response);
            debug!(collection, batch = batch.len(), "Fetched page");
            items.extend(batch);

            match next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        info!(collection, parent, count = items.len(), "Listed collection");
        Ok(items)
    }

    async fn create<T>(&self, parent: &str, collection: &str, body: &T) -> Result<T, ClientError>
    where
        T: Serialize + DeserializeOwned,
    {
        let url = self.collection_url(parent, collection);
        let request = self.http.post(&url).json(body);
        self.send(self.with_language(request), &url).await
    }
}

#[async_trait]
impl AgentClient for DialogflowClient {
    async fn list_entity_types(&self) -> Result<Vec<EntityType>, ClientError> {
        self.list_all(&self.agent, "entityTypes", |page: ListEntityTypesResponse| {
            (page.entity_types, page.next_page_token)
        })
        .await
    }

    async fn list_intents(&self) -> Result<Vec<Intent>, ClientError> {
        self.list_all(&self.agent, "intents", |page: ListIntentsResponse| {
            (page.intents, page.next_page_token)
        })
        .await
    }

    async fn list_pages(&self, flow: &str) -> Result<Vec<Page>, ClientError> {
        self.list_all(flow, "pages", |page: ListPagesResponse| {
            (page.pages, page.next_page_token)
        })
        .await
    }

    async fn create_entity_type(
        &self,
        entity_type: &EntityType,
    ) -> Result<EntityType, ClientError> {
        info!(display_name = %entity_type.display_name, "Creating entity type");
        self.create(&self.agent, "entityTypes", entity_type).await
    }

    async fn create_intent(&self, intent: &Intent) -> Result<Intent, ClientError> {
        info!(display_name = %intent.display_name, "Creating intent");
        self.create(&self.agent, "intents", intent).await
    }

    async fn create_page(&self, flow: &str, page: &Page) -> Result<Page, ClientError> {
        info!(display_name = %page.display_name, flow, "Creating page");
        self.create(flow, "pages", page).await
    }
}
