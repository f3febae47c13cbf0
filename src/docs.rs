// src/docs.rs

use utoipa::openapi::{
    path::{HttpMethod, OperationBuilder, ParameterBuilder, ParameterIn},
    request_body::RequestBodyBuilder,
    security::{Http, HttpAuthScheme, SecurityRequirement, SecurityScheme},
    ContentBuilder, Paths, Ref, Required, ResponseBuilder,
};
use utoipa::OpenApi;

use crate::handlers;
use crate::models::{
    self,
    document::Document,
    finance::{BudgetLine, Invoice, Market},
    incident::Incident,
    meeting::Meeting,
    project::{Project, SubProject},
    resource::Resource,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::set_password,

        // --- Users ---
        handlers::users::list_users,
        handlers::users::get_user,
        handlers::users::get_me,
        handlers::users::create_user,
        handlers::users::update_user,
        handlers::users::delete_user,
        handlers::users::set_device_token,

        // --- Notifications ---
        handlers::notifications::list_notifications,
        handlers::notifications::mark_read,
        handlers::notifications::mark_all_read,

        // --- Dashboard ---
        handlers::dashboard::get_dashboard,

        // --- Documents ---
        handlers::documents::upload,
        handlers::documents::remove,

        // --- Membres ---
        handlers::members::list_project_members,
        handlers::members::add_project_member,
        handlers::members::remove_project_member,
        handlers::members::list_sub_project_members,
        handlers::members::add_sub_project_member,
        handlers::members::remove_sub_project_member,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::Role,
            models::auth::User,
            models::auth::LoginPayload,
            models::auth::RefreshPayload,
            models::auth::SetPasswordPayload,
            models::auth::TokenPair,
            models::auth::CreateUserPayload,
            models::auth::UpdateUserPayload,
            models::auth::DeviceTokenPayload,

            // --- Projetos ---
            models::project::ProjectStatus,
            models::project::ProjectFields,
            models::project::Project,
            models::project::SubProjectFields,
            models::project::SubProject,
            models::member::Member,
            models::member::AddMemberPayload,

            // --- Acompanhamento ---
            models::meeting::MeetingFields,
            models::meeting::Meeting,
            models::incident::IncidentFields,
            models::incident::Incident,
            models::document::DocumentFields,
            models::document::Document,

            // --- Finanças ---
            models::finance::InvoiceStatus,
            models::finance::InvoiceFields,
            models::finance::Invoice,
            models::finance::BudgetLineFields,
            models::finance::BudgetLine,
            models::finance::MarketFields,
            models::finance::Market,

            // --- Notificações / Painel ---
            models::notification::NotificationKind,
            models::notification::Notification,
            models::dashboard::Dashboard,
            models::dashboard::Overview,
            models::dashboard::Assignments,
        )
    ),
    tags(
        (name = "Auth", description = "Login, refresh e definição de senha"),
        (name = "Users", description = "Usuários e perfil"),
        (name = "Projets", description = "Projetos e sous-projets"),
        (name = "Membres", description = "Alocação de usuários"),
        (name = "Suivi", description = "Reuniões, incidentes e documentos"),
        (name = "Documents", description = "Upload e remoção de arquivos"),
        (name = "Finances", description = "Faturas, AP e mercados"),
        (name = "Notifications", description = "Caixa de notificações"),
        (name = "Dashboard", description = "Indicadores por papel")
    ),
    modifiers(&SecurityAddon, &ResourcePaths)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

// Os handlers genéricos não levam #[utoipa::path]; as rotas entram aqui.
struct ResourcePaths;

impl utoipa::Modify for ResourcePaths {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let paths = &mut openapi.paths;
        describe::<Project>(paths, "projet", "Projets", "Project", "ProjectFields");
        describe::<SubProject>(paths, "sous-projet", "Projets", "SubProject", "SubProjectFields");
        describe::<Meeting>(paths, "reunion", "Suivi", "Meeting", "MeetingFields");
        describe::<Incident>(paths, "incident", "Suivi", "Incident", "IncidentFields");
        describe::<Document>(paths, "document", "Suivi", "Document", "DocumentFields");
        describe::<Invoice>(paths, "facture", "Finances", "Invoice", "InvoiceFields");
        describe::<BudgetLine>(paths, "ap", "Finances", "BudgetLine", "BudgetLineFields");
        describe::<Market>(paths, "marche", "Finances", "Market", "MarketFields");
    }
}

fn describe<T: Resource>(paths: &mut Paths, base: &str, tag: &str, schema: &str, fields: &str) {
    let collection = format!("/api/{}/", base);
    let item = format!("/api/{}/{{id}}/", base);

    let json = |name: &str| {
        ContentBuilder::new()
            .schema(Some(Ref::from_schema_name(name)))
            .build()
    };
    let ok = |description: &str, name: &str| {
        ResponseBuilder::new()
            .description(description)
            .content("application/json", json(name))
            .build()
    };
    let path_param = |name: &str| {
        ParameterBuilder::new()
            .name(name)
            .parameter_in(ParameterIn::Path)
            .required(Required::True)
            .build()
    };
    let operation = |summary: String| {
        OperationBuilder::new()
            .tag(tag)
            .summary(Some(summary))
            .security(SecurityRequirement::new("api_jwt", Vec::<String>::new()))
            .response("401", ResponseBuilder::new().description("Não autorizado").build())
            .response("403", ResponseBuilder::new().description("Sem permissão ou fora do escopo").build())
    };

    paths.add_path_operation(
        &collection,
        vec![HttpMethod::Get],
        operation(format!("Lista paginada de {}", T::LABEL))
            .response("200", ok("Envelope paginado; `data` traz os registros", schema))
            .build(),
    );
    // Documentos entram por multipart (handlers::documents::upload)
    if base != "document" {
        paths.add_path_operation(
            &collection,
            vec![HttpMethod::Post],
            operation(format!("Cria {}", T::LABEL))
                .request_body(Some(RequestBodyBuilder::new().content("application/json", json(fields)).build()))
                .response("201", ok("Criado", schema))
                .response("400", ResponseBuilder::new().description("Dados inválidos").build())
                .build(),
        );
    }
    paths.add_path_operation(
        &item,
        vec![HttpMethod::Get],
        operation(format!("Detalhe de {}", T::LABEL))
            .parameter(path_param("id"))
            .response("200", ok("Registro", schema))
            .response("404", ResponseBuilder::new().description("Não encontrado").build())
            .build(),
    );
    paths.add_path_operation(
        &item,
        vec![HttpMethod::Put],
        operation(format!("Atualização parcial de {}", T::LABEL))
            .parameter(path_param("id"))
            .request_body(Some(RequestBodyBuilder::new().content("application/json", json(fields)).build()))
            .response("200", ok("Atualizado", schema))
            .response("400", ResponseBuilder::new().description("Dados inválidos").build())
            .build(),
    );
    if base != "document" {
        paths.add_path_operation(
            &item,
            vec![HttpMethod::Delete],
            operation(format!("Remove {}", T::LABEL))
                .parameter(path_param("id"))
                .response("204", ResponseBuilder::new().description("Removido").build())
                .response("409", ResponseBuilder::new().description("Há registros dependentes").build())
                .build(),
        );
    }

    for parent in T::PARENTS {
        paths.add_path_operation(
            format!("/api/{}/{}/{{parent_id}}/", base, parent.segment),
            vec![HttpMethod::Get],
            operation(format!("{} por {}", T::LABEL, parent.segment))
                .parameter(path_param("parent_id"))
                .response("200", ok("Envelope paginado", schema))
                .build(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_generic_and_annotated_routes() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_value(&doc).unwrap();
        let paths = json["paths"].as_object().unwrap();

        assert!(paths.contains_key("/api/projet/"));
        assert!(paths.contains_key("/api/facture/marche/{parent_id}/"));
        assert!(paths.contains_key("/api/document/"));
        assert!(paths.contains_key("/api/auth/login"));
        assert!(json["components"]["securitySchemes"]["api_jwt"].is_object());

        // Upload documentado pelo handler multipart, não pelo genérico
        let post = &paths["/api/document/"]["post"];
        assert!(post["requestBody"]["content"]["multipart/form-data"].is_object());
    }
}
