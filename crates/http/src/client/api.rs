//! JSON helpers for protected API calls

use super::error::ClientError;
use super::read_json;
use crate::interceptor::Interceptor;
use reqwest::Method;
use serde::{Serialize, de::DeserializeOwned};

/// API client whose calls all run through the [`Interceptor`]
#[derive(Clone)]
pub struct ApiClient {
    interceptor: Interceptor,
}

impl ApiClient {
    pub fn new(interceptor: Interceptor) -> Self {
        Self { interceptor }
    }

    pub fn interceptor(&self) -> &Interceptor {
        &self.interceptor
    }

    /// GET a JSON resource
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let request = self.interceptor.client().request(Method::GET, path).build()?;
        read_json(self.interceptor.send(request).await?).await
    }

    /// POST a JSON body and decode the JSON answer
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .interceptor
            .client()
            .request(Method::POST, path)
            .json(body)
            .build()?;
        read_json(self.interceptor.send(request).await?).await
    }

    /// PUT a JSON body and decode the JSON answer
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .interceptor
            .client()
            .request(Method::PUT, path)
            .json(body)
            .build()?;
        read_json(self.interceptor.send(request).await?).await
    }

    /// DELETE a resource; any answer body is ignored
    pub async fn delete(&self, path: &str) -> Result<(), ClientError> {
        let request = self
            .interceptor
            .client()
            .request(Method::DELETE, path)
            .build()?;
        self.interceptor.send(request).await?;
        Ok(())
    }
}
