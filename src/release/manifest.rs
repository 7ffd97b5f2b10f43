// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Multi-document manifest decoding
//!
//! A rendered release manifest is a stream of YAML documents separated by
//! `---` lines. Each document is decoded on its own: a broken document is
//! skipped with a warning and never hides the others.

use serde::Serialize;
use tracing::warn;

/// One object declared by a release manifest
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceDescriptor {
    pub kind: String,
    pub name: String,
    pub namespace: String,
    #[serde(rename = "apiVersion", skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    /// The full decoded document
    #[serde(skip)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

/// A manifest document that could not be decoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodeWarning {
    /// Position among the non-blank documents (0-based)
    pub index: usize,
    pub reason: String,
}

/// Decoded resources plus the documents that were skipped
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedManifest {
    pub resources: Vec<ResourceDescriptor>,
    pub warnings: Vec<DecodeWarning>,
}

/// Split a manifest on `---` separator lines, dropping blank documents
fn split_documents(manifest: &str) -> Vec<String> {
    let mut documents = Vec::new();
    let mut current = String::new();

    for line in manifest.lines() {
        if line.trim_end() == "---" {
            documents.push(std::mem::take(&mut current));
            continue;
        }
        current.push_str(line);
        current.push('\n');
    }
    documents.push(current);

    documents.retain(|doc| !is_blank_document(doc));
    documents
}

/// Whitespace-only documents, and documents that only carry comments
/// (Helm emits a `# Source:` header even for templates rendering nothing)
fn is_blank_document(doc: &str) -> bool {
    doc.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with('#'))
}

fn string_at<'a>(map: &'a serde_json::Map<String, serde_json::Value>, path: &[&str]) -> &'a str {
    path.split_first()
        .and_then(|(first, rest)| rest.iter().try_fold(map.get(*first)?, |v, key| v.get(*key)))
        .and_then(|v| v.as_str())
        .unwrap_or_default()
}

fn decode_document(
    doc: &str,
    release_namespace: &str,
) -> Result<ResourceDescriptor, String> {
    let value: serde_json::Value = serde_yaml::from_str(doc).map_err(|e| e.to_string())?;
    let serde_json::Value::Object(mut attributes) = value else {
        return Err("document is not a mapping".to_string());
    };

    let kind = string_at(&attributes, &["kind"]).to_string();
    if kind.is_empty() {
        return Err("missing kind".to_string());
    }
    let name = string_at(&attributes, &["metadata", "name"]).to_string();
    if name.is_empty() {
        return Err(format!("{} is missing metadata.name", kind));
    }
    let api_version = string_at(&attributes, &["apiVersion"]).to_string();
    let mut namespace = string_at(&attributes, &["metadata", "namespace"]).to_string();

    if namespace.is_empty() {
        namespace = release_namespace.to_string();
        if let Some(serde_json::Value::Object(metadata)) = attributes.get_mut("metadata") {
            metadata.insert(
                "namespace".to_string(),
                serde_json::Value::String(namespace.clone()),
            );
        }
    }

    Ok(ResourceDescriptor {
        kind,
        name,
        namespace,
        api_version,
        attributes,
    })
}

/// Decode a release manifest into resource descriptors
///
/// Resources keep document order. Documents without a namespace get
/// `release_namespace`. An empty or entirely broken manifest decodes to no
/// resources rather than an error.
pub fn decode_manifest(manifest: &str, release_namespace: &str) -> DecodedManifest {
    let mut decoded = DecodedManifest::default();

    for (index, doc) in split_documents(manifest).iter().enumerate() {
        match decode_document(doc, release_namespace) {
            Ok(resource) => decoded.resources.push(resource),
            Err(reason) => {
                warn!(document = index, error = %reason, "Skipping invalid YAML document");
                decoded.warnings.push(DecodeWarning { index, reason });
            }
        }
    }

    decoded
}
