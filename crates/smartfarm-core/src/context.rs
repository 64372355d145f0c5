// ── Shared request context ──
//
// What every resource client needs: the REST client, the query cache
// and the notification channel. One per `Backend`, shared by `Arc`.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use smartfarm_api::ApiClient;

use crate::command::{Command, CommandResult, route_command};
use crate::error::CoreError;
use crate::mutation::Mutation;
use crate::notify::Notifier;
use crate::query::{QueryCache, QueryKey};

pub(crate) struct Context {
    pub(crate) api: ApiClient,
    pub(crate) cache: QueryCache,
    pub(crate) notifier: Notifier,
}

impl Context {
    pub(crate) fn new(api: ApiClient, notifier: Notifier) -> Self {
        Self {
            api,
            cache: QueryCache::with_notifier(notifier.clone()),
            notifier,
        }
    }

    /// Cached `GET path`.
    pub(crate) async fn query<T>(&self, key: QueryKey, stale_time: Duration, path: String) -> Result<Arc<T>, CoreError>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let api = self.api.clone();
        self.cache
            .fetch(key, stale_time, move || async move {
                api.get::<T>(&path).await.map_err(CoreError::from)
            })
            .await
    }

    /// Cached `GET path?params`.
    pub(crate) async fn query_with<T, P>(
        &self,
        key: QueryKey,
        stale_time: Duration,
        path: String,
        params: P,
    ) -> Result<Arc<T>, CoreError>
    where
        T: DeserializeOwned + Send + Sync + 'static,
        P: Serialize + Send + Sync + 'static,
    {
        let api = self.api.clone();
        self.cache
            .fetch(key, stale_time, move || async move {
                api.get_with_params::<T, P>(&path, &params)
                    .await
                    .map_err(CoreError::from)
            })
            .await
    }

    /// Run a typed command and apply its cache effects on success.
    pub(crate) async fn execute(&self, command: Command) -> Result<CommandResult, CoreError> {
        command.validate()?;
        let mutation = Mutation::new(command.effects(), command.success_message(), command.failure_message());
        mutation
            .run(self, async { route_command(&self.api, command).await.map_err(CoreError::from) })
            .await
    }
}
