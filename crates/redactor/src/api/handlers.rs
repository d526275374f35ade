//! API request handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use base64::Engine;

use crate::taxonomy::EntityTypeUpdate;
use crate::text_detector::{self, NerMode};
use crate::types::CorefTable;
use crate::vision;

use super::{
    error::ApiError,
    types::{
        AppState, CreateEntityTypeRequest, HealthResponse, RedactImageRequest, RedactImageResponse,
        RedactTextRequest, RedactTextResponse, TaxonomyListResponse, ToggleResponse, UpdateEntityTypeRequest,
    },
};

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok".to_string(), version: env!("CARGO_PKG_VERSION").to_string() })
}

pub async fn taxonomy_list_handler(State(state): State<AppState>) -> Json<TaxonomyListResponse> {
    Json(state.taxonomy.snapshot().list(false).into_iter().cloned().collect())
}

pub async fn taxonomy_create_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateEntityTypeRequest>,
) -> Result<Json<crate::taxonomy::EntityTypeConfig>, ApiError> {
    let mut created = None;
    state.taxonomy.update(|registry| {
        created = registry
            .create(
                req.name.clone(),
                req.category,
                req.description.clone(),
                req.examples.clone(),
                req.color.clone(),
                req.regex_pattern.clone(),
                req.use_llm,
                req.tag_template.clone(),
            )
            .ok();
    })?;
    created.map(Json).ok_or_else(|| ApiError::from(crate::error::RedactorError::invalid_input("entity type creation failed")))
}

pub async fn taxonomy_update_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<UpdateEntityTypeRequest>,
) -> Result<Json<crate::taxonomy::EntityTypeConfig>, ApiError> {
    let mut result = None;
    state.taxonomy.update(|registry| {
        result = registry.update(&id, patch_clone(&patch)).ok();
    })?;
    result.map(Json).ok_or_else(|| ApiError::from(crate::error::RedactorError::not_found(format!("entity type '{id}'"))))
}

fn patch_clone(patch: &EntityTypeUpdate) -> EntityTypeUpdate {
    EntityTypeUpdate {
        name: patch.name.clone(),
        description: patch.description.clone(),
        examples: patch.examples.clone(),
        color: patch.color.clone(),
        regex_pattern: patch.regex_pattern.clone(),
        use_llm: patch.use_llm,
        enabled: patch.enabled,
        order: patch.order,
        tag_template: patch.tag_template.clone(),
    }
}

pub async fn taxonomy_delete_handler(State(state): State<AppState>, Path(id): Path<String>) -> Result<(), ApiError> {
    let mut outcome = Ok(());
    state.taxonomy.update(|registry| {
        outcome = registry.delete(&id);
    })?;
    outcome.map_err(ApiError::from)
}

pub async fn taxonomy_toggle_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ToggleResponse>, ApiError> {
    let mut enabled = None;
    state.taxonomy.update(|registry| {
        enabled = registry.toggle(&id).ok();
    })?;
    enabled
        .map(|enabled| Json(ToggleResponse { id: id.clone(), enabled }))
        .ok_or_else(|| ApiError::from(crate::error::RedactorError::not_found(format!("entity type '{id}'"))))
}

pub async fn taxonomy_reset_handler(State(state): State<AppState>) -> Result<Json<TaxonomyListResponse>, ApiError> {
    state.taxonomy.update(|registry| registry.reset())?;
    Ok(Json(state.taxonomy.snapshot().list(false).into_iter().cloned().collect()))
}

/// Sorts by descending length so a longer mention claims its span before a
/// shorter one that happens to be its substring, mirroring the writer
/// adapters' claim order.
fn apply_entity_map(text: &str, entity_map: &std::collections::HashMap<String, String>) -> String {
    let mut needles: Vec<&String> = entity_map.keys().collect();
    needles.sort_by_key(|b| std::cmp::Reverse(b.chars().count()));

    let mut out = text.to_string();
    for needle in needles {
        if needle.is_empty() {
            continue;
        }
        let replacement = &entity_map[needle];
        out = out.replace(needle.as_str(), replacement);
    }
    out
}

pub async fn redact_text_handler(
    State(state): State<AppState>,
    Json(req): Json<RedactTextRequest>,
) -> Result<Json<RedactTextResponse>, ApiError> {
    let registry = state.taxonomy.snapshot();
    let enabled_type_ids: Vec<String> = req
        .enabled_type_ids
        .unwrap_or_else(|| registry.list(true).into_iter().map(|e| e.id.clone()).collect());

    let mut coref = CorefTable::new();
    let detection =
        text_detector::detect(&req.text, &registry, &enabled_type_ids, &state.ner_client, NerMode::Auto, &mut coref)
            .await;

    for warning in &detection.warnings {
        tracing::warn!(stage = %warning.stage, message = %warning.message, "text detection warning");
    }

    let mut engine = crate::replacement::ReplacementEngine::new();
    let (entity_map, comparison) =
        engine.resolve_all(&detection.entities, req.mode, &registry, &mut coref, req.custom_map.as_ref());

    let redacted_text = apply_entity_map(&req.text, &entity_map);

    Ok(Json(RedactTextResponse { redacted_text, entity_map, comparison }))
}

pub async fn redact_image_handler(
    State(state): State<AppState>,
    Json(req): Json<RedactImageRequest>,
) -> Result<Json<RedactImageResponse>, ApiError> {
    let image_bytes = base64::engine::general_purpose::STANDARD
        .decode(&req.image_base64)
        .map_err(|e| crate::error::RedactorError::invalid_input(format!("invalid base64 image: {e}")))?;

    let registry = state.taxonomy.snapshot();
    let ocr_enabled_type_ids = req
        .ocr_enabled_type_ids
        .unwrap_or_else(|| registry.list(true).into_iter().map(|e| e.id.clone()).collect());
    let vlm_enabled_type_ids = req
        .vlm_enabled_type_ids
        .unwrap_or_else(|| registry.list(true).into_iter().map(|e| e.id.clone()).collect());

    let fused = vision::detect(
        &state.ocr_client,
        &state.ner_client,
        &state.vlm_detector,
        &image_bytes,
        req.width,
        req.height,
        &registry,
        &ocr_enabled_type_ids,
        &vlm_enabled_type_ids,
    )
    .await;

    for warning in &fused.warnings {
        tracing::warn!(stage = %warning.stage, message = %warning.message, "vision detection warning");
    }

    Ok(Json(RedactImageResponse { boxes: fused.boxes }))
}
