use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use log::debug;
use reqwest::Method;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::filter::SearchFilter;
use crate::domain::folder::{
    DeleteMode, FolderHandle, FolderKind, SavedSearchDefinition, Traversal, WellKnownFolder,
};
use crate::domain::item::{Item, Page, PageRequest, SortDirection};
use crate::mail::service::MailService;

const SEARCH_FOLDER_TYPE: &str = "#microsoft.graph.mailSearchFolder";

/// Blocking client for a Graph-style mail REST API, scoped to one mailbox.
pub struct GraphMailService {
    http: Client,
    base: Url,
    mailbox: String,
    access_token: String,
}

impl GraphMailService {
    pub fn new(
        endpoint: &str,
        api_version: &str,
        mailbox: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self> {
        let mut base = Url::parse(endpoint)
            .map_err(|e| anyhow!("Invalid service endpoint '{endpoint}': {e}"))?;
        base.path_segments_mut()
            .map_err(|_| anyhow!("service endpoint cannot be a base: {endpoint}"))?
            .pop_if_empty()
            .push(api_version);

        Ok(Self {
            http: Client::new(),
            base,
            mailbox: mailbox.into(),
            access_token: access_token.into(),
        })
    }

    /// `{base}/users/{mailbox}/mailFolders/{segments...}`
    fn folders_url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.push("users").push(&self.mailbox).push("mailFolders");
            path.extend(segments);
        }
        url
    }

    fn items_url(&self, folder: &FolderHandle, request: &PageRequest) -> Url {
        let mut url = self.folders_url(&[&folder.id, "messages"]);
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("$top", &request.size.to_string())
                .append_pair("$skip", &request.offset.to_string())
                .append_pair("$select", "subject,receivedDateTime");
            if let Some(sort) = &request.sort {
                let direction = match sort.direction {
                    SortDirection::Ascending => "asc",
                    SortDirection::Descending => "desc",
                };
                query.append_pair(
                    "$orderby",
                    &format!("{} {}", sort.property.wire_name(), direction),
                );
            }
            if let Some(filter) = &request.filter {
                query.append_pair("$filter", &filter.to_string());
            }
        }
        url
    }

    fn child_folders_url(&self, parent: &FolderHandle, filter: &SearchFilter, max: usize) -> Url {
        let mut url = self.folders_url(&[&parent.id, "childFolders"]);
        url.query_pairs_mut()
            .append_pair("$filter", &filter.to_string())
            .append_pair("$top", &max.to_string());
        url
    }

    fn delete_target(&self, folder: &FolderHandle, mode: DeleteMode) -> (Method, Url) {
        match mode {
            DeleteMode::Hard => (
                Method::POST,
                self.folders_url(&[&folder.id, "permanentDelete"]),
            ),
            DeleteMode::Soft => (Method::DELETE, self.folders_url(&[&folder.id])),
        }
    }

    /// Update in place when the definition already exists, create otherwise.
    fn save_target(
        &self,
        definition: &SavedSearchDefinition,
        parent: &FolderHandle,
    ) -> (Method, Url) {
        match &definition.id {
            Some(id) => (Method::PATCH, self.folders_url(&[id])),
            None => (
                Method::POST,
                self.folders_url(&[&parent.id, "childFolders"]),
            ),
        }
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.bearer_auth(&self.access_token).send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!("mail API returned {status}: {body}"));
        }
        Ok(response)
    }

    fn fetch_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        Ok(self.send(request)?.json()?)
    }
}

impl MailService for GraphMailService {
    fn bind(&self, folder: WellKnownFolder) -> Result<FolderHandle> {
        let url = self.folders_url(&[folder.wire_name()]);
        let raw: RawFolder = self
            .fetch_json(self.http.get(url))
            .with_context(|| format!("binding {}", folder.wire_name()))?;
        Ok(raw.into_handle())
    }

    fn find_items(&self, folder: &FolderHandle, request: &PageRequest) -> Result<Page> {
        let url = self.items_url(folder, request);
        debug!(
            "listing {} offset={} size={}",
            folder.display_name, request.offset, request.size
        );
        let list: ListResponse<RawMessage> = self
            .fetch_json(self.http.get(url))
            .with_context(|| format!("listing items in {}", folder.display_name))?;

        let items = list
            .value
            .into_iter()
            .map(RawMessage::into_item)
            .collect::<Result<Vec<_>>>()?;

        Ok(Page {
            items,
            more_available: list.next_link.is_some(),
        })
    }

    fn find_folders(
        &self,
        parent: &FolderHandle,
        filter: &SearchFilter,
        max_count: usize,
    ) -> Result<Vec<FolderHandle>> {
        let url = self.child_folders_url(parent, filter, max_count);
        let list: ListResponse<RawFolder> = self
            .fetch_json(self.http.get(url))
            .with_context(|| format!("listing folders under {}", parent.display_name))?;

        Ok(list.value.into_iter().map(RawFolder::into_handle).collect())
    }

    fn delete_folder(&self, folder: &FolderHandle, mode: DeleteMode) -> Result<()> {
        let (method, url) = self.delete_target(folder, mode);
        self.send(self.http.request(method, url))
            .with_context(|| format!("deleting folder {}", folder.display_name))?;
        Ok(())
    }

    fn load_search_definition(&self, folder: &FolderHandle) -> Result<SavedSearchDefinition> {
        let url = self.folders_url(&[&folder.id]);
        let raw: RawSearchFolder = self
            .fetch_json(self.http.get(url))
            .with_context(|| format!("loading search parameters of {}", folder.display_name))?;
        Ok(raw.into_definition())
    }

    fn save_search_definition(
        &self,
        definition: &SavedSearchDefinition,
        parent: &FolderHandle,
    ) -> Result<SavedSearchDefinition> {
        let body = RawSearchFolder::from_definition(definition);
        let (method, url) = self.save_target(definition, parent);
        let saved: RawSearchFolder = self
            .fetch_json(self.http.request(method, url).json(&body))
            .with_context(|| format!("saving search folder {}", definition.display_name))?;
        Ok(saved.into_definition())
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
    value: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct RawFolder {
    id: String,
    #[serde(rename = "displayName", default)]
    display_name: String,
    #[serde(rename = "@odata.type")]
    odata_type: Option<String>,
}

impl RawFolder {
    fn into_handle(self) -> FolderHandle {
        let kind = match self.odata_type.as_deref() {
            None | Some("#microsoft.graph.mailFolder") => FolderKind::Mail,
            Some(SEARCH_FOLDER_TYPE) => FolderKind::SearchFolder,
            Some(other) => FolderKind::Other(other.to_string()),
        };
        FolderHandle {
            id: self.id,
            display_name: self.display_name,
            kind,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    id: String,
    subject: Option<String>,
    #[serde(rename = "receivedDateTime")]
    received_date_time: String,
}

impl RawMessage {
    fn into_item(self) -> Result<Item> {
        let received = DateTime::parse_from_rfc3339(&self.received_date_time)
            .map_err(|e| {
                anyhow!(
                    "message {} has bad receivedDateTime '{}': {e}",
                    self.id,
                    self.received_date_time
                )
            })?
            .with_timezone(&Utc);
        Ok(Item {
            id: self.id,
            subject: self.subject.unwrap_or_default(),
            received,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RawSearchFolder {
    #[serde(rename = "@odata.type", default)]
    odata_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(rename = "displayName")]
    display_name: String,
    #[serde(rename = "filterQuery", default)]
    filter_query: String,
    #[serde(rename = "sourceFolderIds", default)]
    source_folder_ids: Vec<String>,
    #[serde(rename = "includeNestedFolders", default)]
    include_nested_folders: bool,
}

impl RawSearchFolder {
    fn from_definition(definition: &SavedSearchDefinition) -> Self {
        Self {
            odata_type: SEARCH_FOLDER_TYPE.trim_start_matches('#').to_string(),
            id: None,
            display_name: definition.display_name.clone(),
            filter_query: definition.filter.to_string(),
            source_folder_ids: definition.root_folders.clone(),
            include_nested_folders: definition.traversal == Traversal::Deep,
        }
    }

    fn into_definition(self) -> SavedSearchDefinition {
        SavedSearchDefinition {
            id: self.id,
            display_name: self.display_name,
            filter: SearchFilter::parse(&self.filter_query),
            root_folders: self.source_folder_ids,
            traversal: if self.include_nested_folders {
                Traversal::Deep
            } else {
                Traversal::Shallow
            },
        }
    }
}
