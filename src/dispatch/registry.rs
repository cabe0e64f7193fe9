use crate::{
    config::Config,
    dispatch::types::{ActionRequest, Outcome},
    errors::{AppError, AppResult},
    resolver::PathResolver,
};
use async_trait::async_trait;
use std::sync::Arc;

pub type DynAction = Arc<dyn Action + Send + Sync + 'static>;

#[async_trait]
pub trait Action {
    fn name(&self) -> &'static str;
    async fn call(&self, req: &ActionRequest) -> AppResult<Outcome>;
}

#[derive(Clone)]
pub struct ActionRegistry {
    actions: Vec<(String, DynAction)>,
}

impl ActionRegistry {
    pub fn new(cfg: &Config, resolver: Arc<PathResolver>) -> anyhow::Result<Self> {
        use crate::actions::{
            create::{CreateDir, CreateFile},
            delete::{DeleteDir, DeleteFile},
            edit::{Rename, SaveFile},
            fetch::FetchRemote,
        };
        let list: Vec<DynAction> = vec![
            Arc::new(CreateFile::new(resolver.clone())),
            Arc::new(CreateDir::new(resolver.clone())),
            Arc::new(DeleteFile::new(resolver.clone())),
            Arc::new(DeleteDir::new(resolver.clone())),
            Arc::new(Rename::new(resolver.clone())),
            Arc::new(SaveFile::new(resolver.clone())),
            Arc::new(FetchRemote::new(cfg, resolver)?),
        ];
        let mut actions: Vec<(String, DynAction)> =
            list.into_iter().map(|a| (a.name().to_string(), a)).collect();
        actions.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(Self { actions })
    }

    pub fn get(&self, name: &str) -> Option<DynAction> { self.actions.iter().find(|(n, _)| n == name).map(|(_, a)| a.clone()) }
    pub fn list_names(&self) -> Vec<String> { self.actions.iter().map(|(n, _)| n.clone()).collect() }

    pub async fn dispatch(&self, req: &ActionRequest) -> AppResult<Outcome> {
        let action = self.get(&req.action).ok_or_else(|| AppError::UnknownAction(req.action.clone()))?;
        action.call(req).await
    }
}
