//! Format renderers (§6): JSON is the schema-versioned source of truth,
//! Markdown is the human-readable rendering, ZIP bundles both plus one
//! Markdown file per memory.

use crate::model::{JsonExportEnvelope, JsonExportMemory, JSON_EXPORT_SCHEMA_VERSION};
use memos_core::OrganizationId;
use memos_store::Memory;
use std::io::Write;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to serialize export: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to build archive: {0}")]
    Archive(String),
}

fn to_export_memory(memory: &Memory) -> JsonExportMemory {
    JsonExportMemory {
        id: memory.id,
        title: memory.title.clone(),
        content: memory.content_preview.clone(),
        scope: memory.scope,
        tags: memory.tags.clone(),
        source_type: memory.source_type.clone(),
        created_at: memory.created_at,
        updated_at: memory.updated_at,
        metadata: memory.metadata.clone(),
    }
}

pub fn build_json_export(organization_id: OrganizationId, memories: &[Memory]) -> Result<Vec<u8>, ExportError> {
    let envelope = JsonExportEnvelope {
        version: JSON_EXPORT_SCHEMA_VERSION,
        export_date: chrono::Utc::now(),
        organization_id,
        memory_count: memories.len(),
        memories: memories.iter().map(to_export_memory).collect(),
    };
    Ok(serde_json::to_vec_pretty(&envelope)?)
}

pub fn build_markdown_export(organization_id: OrganizationId, memories: &[Memory]) -> Vec<u8> {
    let mut out = String::new();
    out.push_str("# Memory Export\n\n");
    out.push_str(&format!("**Organization**: {organization_id}  \n"));
    out.push_str(&format!("**Export Date**: {}  \n", chrono::Utc::now().to_rfc3339()));
    out.push_str(&format!("**Memory Count**: {}\n\n---\n", memories.len()));

    for memory in memories {
        out.push_str(&format!("\n## {}\n\n", memory.title));
        out.push_str(&format!("**ID**: `{}`  \n", memory.id));
        out.push_str(&format!("**Scope**: {}  \n", memory.scope.as_str()));
        out.push_str(&format!(
            "**Tags**: {}  \n",
            if memory.tags.is_empty() { "None".to_string() } else { memory.tags.join(", ") }
        ));
        out.push_str(&format!("**Created**: {}  \n\n", memory.created_at.to_rfc3339()));
        out.push_str("### Content\n\n");
        out.push_str(&memory.content_preview);
        out.push_str("\n\n---\n");
    }

    out.into_bytes()
}

pub fn build_zip_export(organization_id: OrganizationId, memories: &[Memory]) -> Result<Vec<u8>, ExportError> {
    let json_content = build_json_export(organization_id, memories)?;
    let markdown_content = build_markdown_export(organization_id, memories);

    let mut buffer = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buffer);
        let options = zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        writer
            .start_file("memories.json", options)
            .map_err(|e| ExportError::Archive(e.to_string()))?;
        writer.write_all(&json_content).map_err(|e| ExportError::Archive(e.to_string()))?;

        writer
            .start_file("memories.md", options)
            .map_err(|e| ExportError::Archive(e.to_string()))?;
        writer.write_all(&markdown_content).map_err(|e| ExportError::Archive(e.to_string()))?;

        for memory in memories {
            writer
                .start_file(format!("memories/{}.md", memory.id), options)
                .map_err(|e| ExportError::Archive(e.to_string()))?;
            let content = format!("# {}\n\n{}", memory.title, memory.content_preview);
            writer.write_all(content.as_bytes()).map_err(|e| ExportError::Archive(e.to_string()))?;
        }

        writer.finish().map_err(|e| ExportError::Archive(e.to_string()))?;
    }

    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use memos_core::{new_id, Scope};
    use memos_store::{Classification, MemoryType};
    use std::collections::HashMap;

    fn memory(organization_id: OrganizationId, title: &str) -> Memory {
        let now = chrono::Utc::now();
        Memory {
            id: new_id(),
            organization_id,
            owner_user_id: new_id(),
            scope: Scope::Personal,
            scope_id: None,
            memory_type: MemoryType::ShortTerm,
            classification: Classification::Internal,
            required_clearance: 0,
            title: title.to_string(),
            content_preview: "some content".to_string(),
            content_hash: "hash".to_string(),
            tags: vec!["tag-a".to_string()],
            entities: HashMap::new(),
            metadata: serde_json::json!({}),
            source_type: "api".to_string(),
            vector_id: None,
            embedding_model: None,
            is_active: true,
            legal_hold: false,
            created_at: now,
            updated_at: now,
            access_count: 0,
            last_accessed_at: None,
        }
    }

    #[test]
    fn json_export_round_trips_memory_count() {
        let org = new_id();
        let memories = vec![memory(org, "one"), memory(org, "two")];
        let bytes = build_json_export(org, &memories).unwrap();
        let envelope: JsonExportEnvelope = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(envelope.memory_count, 2);
        assert_eq!(envelope.version, JSON_EXPORT_SCHEMA_VERSION);
    }

    #[test]
    fn markdown_export_includes_every_title() {
        let org = new_id();
        let memories = vec![memory(org, "alpha"), memory(org, "beta")];
        let text = String::from_utf8(build_markdown_export(org, &memories)).unwrap();
        assert!(text.contains("## alpha"));
        assert!(text.contains("## beta"));
    }

    #[test]
    fn zip_export_contains_json_markdown_and_per_memory_files() {
        let org = new_id();
        let memories = vec![memory(org, "gamma")];
        let bytes = build_zip_export(org, &memories).unwrap();
        let reader = std::io::Cursor::new(bytes);
        let mut archive = zip::ZipArchive::new(reader).unwrap();

        let names: Vec<String> = (0..archive.len()).map(|i| archive.by_index(i).unwrap().name().to_string()).collect();
        assert!(names.contains(&"memories.json".to_string()));
        assert!(names.contains(&"memories.md".to_string()));
        assert!(names.iter().any(|n| n.starts_with("memories/") && n.ends_with(".md")));
    }
}
