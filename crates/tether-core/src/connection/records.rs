//! CRM record operations routed through a live connection

use super::manager::ConnectionManager;
use crate::api::{CreateRecordParams, RecordResult, SearchParams, SearchResult, UpdateRecordParams};
use crate::error::RemoteResult;

impl ConnectionManager {
    /// Search records; fails fast unless connected
    pub async fn search_records(&self, params: SearchParams) -> RemoteResult<SearchResult> {
        self.passthrough("search records", |api| api.search_records(params.clone()))
            .await
    }

    pub async fn create_record(&self, params: CreateRecordParams) -> RemoteResult<RecordResult> {
        self.passthrough("create record", |api| api.create_record(params.clone()))
            .await
    }

    pub async fn update_record(&self, params: UpdateRecordParams) -> RemoteResult<RecordResult> {
        self.passthrough("update record", |api| api.update_record(params.clone()))
            .await
    }

    pub async fn delete_record(&self, module: &str, id: &str) -> RemoteResult<RecordResult> {
        self.passthrough("delete record", |api| api.delete_record(module, id))
            .await
    }
}
