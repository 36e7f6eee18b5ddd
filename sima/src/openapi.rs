//! OpenAPI document assembly. Served as JSON at `/api/docs/openapi.json`.

use utoipa::OpenApi;

use crate::api::models::{
    CreatedResponse, OkResponse,
    audit::AuditLogResponse,
    auth::{AdminChangePasswordRequest, ChangeOwnPasswordRequest, LoginRequest, RefreshRequest, TokenPair},
    personas::{ComisariaCount, PersonaDetailResponse, PersonaInput, PersonaResponse, StatisticsResponse},
    registros::{RegistroDetailResponse, RegistroInput, RegistroResponse},
    users::{CreatedUserResponse, CurrentUser, Role, UserInput, UserResponse},
};
use crate::errors::{ErrorBody, FieldViolation};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "S.I.M.A. API",
        description = "Records-management service for registered persons and criminal-record entries"
    ),
    paths(
        crate::api::handlers::auth::login,
        crate::api::handlers::auth::refresh,
        crate::api::handlers::auth::logout,
        crate::api::handlers::personas::search,
        crate::api::handlers::personas::create,
        crate::api::handlers::personas::get,
        crate::api::handlers::personas::update,
        crate::api::handlers::personas::remove,
        crate::api::handlers::personas::stats,
        crate::api::handlers::registros::search,
        crate::api::handlers::registros::create,
        crate::api::handlers::registros::get,
        crate::api::handlers::registros::update,
        crate::api::handlers::registros::remove,
        crate::api::handlers::registros::duplicate,
        crate::api::handlers::usuarios::list,
        crate::api::handlers::usuarios::create,
        crate::api::handlers::usuarios::get,
        crate::api::handlers::usuarios::update,
        crate::api::handlers::usuarios::remove,
        crate::api::handlers::usuarios::revoke_tokens,
        crate::api::handlers::usuarios::change_own_password,
        crate::api::handlers::usuarios::admin_change_password,
        crate::api::handlers::usuarios::get_profile,
        crate::api::handlers::usuarios::update_profile,
        crate::api::handlers::audit::recent,
        crate::api::handlers::audit::entity_history,
        crate::api::handlers::audit::actor_history,
        crate::api::handlers::system::health,
        crate::api::handlers::system::metrics,
    ),
    components(schemas(
        LoginRequest,
        RefreshRequest,
        TokenPair,
        ChangeOwnPasswordRequest,
        AdminChangePasswordRequest,
        UserInput,
        UserResponse,
        CreatedUserResponse,
        CurrentUser,
        Role,
        PersonaInput,
        PersonaResponse,
        PersonaDetailResponse,
        StatisticsResponse,
        ComisariaCount,
        RegistroInput,
        RegistroResponse,
        RegistroDetailResponse,
        AuditLogResponse,
        CreatedResponse,
        OkResponse,
        ErrorBody,
        FieldViolation,
    )),
    tags(
        (name = "auth", description = "Login and token lifecycle"),
        (name = "personas", description = "Registered persons"),
        (name = "registros", description = "Criminal-record entries"),
        (name = "usuarios", description = "User management"),
        (name = "audit", description = "Audit trail"),
        (name = "system", description = "Health and observability"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_builds_and_serializes() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json["paths"]["/api/auth/login"]["post"].is_object());
        assert!(json["paths"]["/api/personas"]["get"].is_object());
        assert!(json["components"]["schemas"]["TokenPair"].is_object());
    }
}
