use std::future::Future;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A function the model is forced to call, described by a JSON schema.
#[derive(Clone, Debug, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

impl FunctionDefinition {
    /// Build a definition whose parameter schema is derived from `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if the generated schema cannot be serialized.
    pub fn for_type<T: JsonSchema>(
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, LlmError> {
        let mut parameters = serde_json::to_value(schemars::schema_for!(T))?;
        if let Some(obj) = parameters.as_object_mut() {
            obj.remove("$schema");
            obj.remove("title");
        }
        Ok(Self {
            name: name.into(),
            description: description.into(),
            parameters,
        })
    }
}

pub trait LlmProvider: Send + Sync {
    /// Embed a single text.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider does not support embeddings or the request fails.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, LlmError>> + Send;

    /// Embed several texts, preserving input order.
    ///
    /// The default implementation issues one request per text.
    ///
    /// # Errors
    ///
    /// Returns the first embedding error encountered.
    fn embed_batch(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, LlmError>> + Send {
        async move {
            let mut out = Vec::with_capacity(texts.len());
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }
    }

    fn supports_embeddings(&self) -> bool;

    /// Force the model to call `function` and return the parsed call arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the model answers without calling the function.
    fn call_function(
        &self,
        messages: &[Message],
        function: &FunctionDefinition,
    ) -> impl Future<Output = Result<serde_json::Value, LlmError>> + Send;

    fn name(&self) -> &'static str;
}

/// Call `function` and deserialize its arguments into `T`.
///
/// # Errors
///
/// Returns an error if the call fails or the arguments do not match `T`.
pub async fn call_function_typed<P, T>(
    provider: &P,
    messages: &[Message],
    function: &FunctionDefinition,
) -> Result<T, LlmError>
where
    P: LlmProvider,
    T: DeserializeOwned,
{
    let value = provider.call_function(messages, function).await?;
    serde_json::from_value(value).map_err(|e| LlmError::StructuredParse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize, JsonSchema)]
    #[allow(dead_code)]
    struct Sample {
        /// Things to list.
        items: Vec<String>,
    }

    #[test]
    fn function_definition_from_type() {
        let def = FunctionDefinition::for_type::<Sample>("sample", "A sample").unwrap();
        assert_eq!(def.name, "sample");
        assert_eq!(def.parameters["type"], "object");
        assert_eq!(def.parameters["properties"]["items"]["type"], "array");
        assert_eq!(def.parameters["required"][0], "items");
        assert!(def.parameters.get("$schema").is_none());
    }

    #[test]
    fn message_constructors() {
        assert_eq!(Message::system("a").role, Role::System);
        assert_eq!(Message::user("b").role, Role::User);
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }
}
