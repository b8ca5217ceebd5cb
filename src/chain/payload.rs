// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Entry functions exposed by the feed module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFunction {
    Initialize,
    CreatePost,
    CreateComment,
    EditPostWithImage,
    DeletePost,
    UpdateProfile,
}

impl FeedFunction {
    pub fn name(&self) -> &'static str {
        match self {
            FeedFunction::Initialize => "initialize",
            FeedFunction::CreatePost => "create_post",
            FeedFunction::CreateComment => "create_comment",
            FeedFunction::EditPostWithImage => "edit_post_with_image",
            FeedFunction::DeletePost => "delete_post",
            FeedFunction::UpdateProfile => "update_profile",
        }
    }
}

/// JSON entry-function payload handed to the wallet for signing. Arguments are
/// positional and must match the Move signature; `u64`s travel as strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFunctionPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: String,
    pub type_arguments: Vec<String>,
    pub arguments: Vec<Value>,
}

impl EntryFunctionPayload {
    pub fn function_name(&self) -> &str {
        self.function.rsplit("::").next().unwrap_or_default()
    }
}

/// Builds payloads against the currently configured module
#[derive(Debug, Clone)]
pub struct PayloadBuilder {
    module_address: String,
    module_name: String,
}

impl PayloadBuilder {
    pub fn new(module_address: impl Into<String>, module_name: impl Into<String>) -> Self {
        Self {
            module_address: module_address.into(),
            module_name: module_name.into(),
        }
    }

    /// Fully-qualified name, e.g. `0x…::feed::create_post`
    pub fn function_id(&self, function: FeedFunction) -> String {
        format!("{}::{}::{}", self.module_address, self.module_name, function.name())
    }

    /// Fully-qualified resource type, e.g. `0x…::feed::Feed`
    pub fn resource_type(&self, resource: &str) -> String {
        format!("{}::{}::{}", self.module_address, self.module_name, resource)
    }

    fn build(&self, function: FeedFunction, arguments: Vec<Value>) -> EntryFunctionPayload {
        EntryFunctionPayload {
            kind: "entry_function_payload".to_string(),
            function: self.function_id(function),
            type_arguments: Vec::new(),
            arguments,
        }
    }

    pub fn initialize(&self) -> EntryFunctionPayload {
        self.build(FeedFunction::Initialize, Vec::new())
    }

    pub fn create_post(&self, content: &str, image_url: &str, style: u8) -> EntryFunctionPayload {
        self.build(
            FeedFunction::CreatePost,
            vec![content.into(), image_url.into(), Value::from(style)],
        )
    }

    pub fn create_comment(&self, parent_id: u64, content: &str, image_url: &str) -> EntryFunctionPayload {
        self.build(
            FeedFunction::CreateComment,
            vec![parent_id.to_string().into(), content.into(), image_url.into()],
        )
    }

    pub fn edit_post_with_image(&self, post_id: u64, content: &str, image_url: &str) -> EntryFunctionPayload {
        self.build(
            FeedFunction::EditPostWithImage,
            vec![post_id.to_string().into(), content.into(), image_url.into()],
        )
    }

    pub fn delete_post(&self, post_id: u64) -> EntryFunctionPayload {
        self.build(FeedFunction::DeletePost, vec![post_id.to_string().into()])
    }

    pub fn update_profile(&self, display_name: &str, bio: &str, avatar_url: &str) -> EntryFunctionPayload {
        self.build(
            FeedFunction::UpdateProfile,
            vec![display_name.into(), bio.into(), avatar_url.into()],
        )
    }
}
