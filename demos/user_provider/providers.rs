//! `providers` service
//!
//! Plain CRUD over the providers collection. The only business rule is that
//! a provider needs a non-empty name of at most 64 characters.

use svcrest::prelude::*;

pub const NAME: &str = "providers";

const MAX_NAME_LEN: usize = 64;

pub fn descriptor(collection: Arc<dyn Collection>) -> ServiceDescriptor {
    let settings = ServiceSettings::new(NAME)
        .rest("providers")
        .with_collection(collection)
        .with_prop_filter("id name createdAt updatedAt");

    ServiceDescriptor::new(settings)
        .action("find", find)
        .action("get", get)
        .action("create", create)
        .action("update", update)
        .action("remove", remove)
        .method("validateParams", validate_params)
}

fn find(ctx: &mut Context) -> ActionFuture<'_> {
    Box::pin(async move {
        let service = ctx.service().clone();
        let options = ctx.apply_page_sort(FindOptions::default());
        let docs = service
            .require_collection()?
            .find(&json!({}), options)
            .await?;

        let json = service.serialize(Value::Array(docs), None);
        service.populate_related(json, None).await
    })
}

fn get(ctx: &mut Context) -> ActionFuture<'_> {
    Box::pin(async move { Ok(ctx.assert_entity_exists("ProviderNotFound")?.clone()) })
}

fn create(ctx: &mut Context) -> ActionFuture<'_> {
    Box::pin(async move {
        let service = ctx.service().clone();
        service.call_method("validateParams", ctx, json!(true)).await?;

        let provider = json!({ "name": ctx.params.get("name").cloned().unwrap_or(Value::Null) });
        let doc = service.require_collection()?.save(provider).await?;

        let json = service.serialize(doc, None);
        service.populate_related(json, None).await
    })
}

fn update(ctx: &mut Context) -> ActionFuture<'_> {
    Box::pin(async move {
        ctx.assert_entity_exists("ProviderNotFound")?;
        let service = ctx.service().clone();
        service.call_method("validateParams", ctx, json!(false)).await?;

        let collection = service.require_collection()?;
        let id = ctx.model_id.clone().unwrap_or(Value::Null);
        let Some(mut doc) = collection.find_by_id(&id).await? else {
            return Err(ServiceError::model_not_found("ProviderNotFound"));
        };

        if let Some(name) = ctx.params.get("name").filter(|v| !v.is_null()) {
            doc["name"] = name.clone();
        }
        let doc = collection.save(doc).await?;

        let json = service.serialize(doc, None);
        service.populate_related(json, None).await
    })
}

fn remove(ctx: &mut Context) -> ActionFuture<'_> {
    Box::pin(async move {
        let model = ctx.assert_entity_exists("ProviderNotFound")?.clone();
        let service = ctx.service().clone();
        let id = ctx.model_id.clone().unwrap_or(Value::Null);

        service
            .require_collection()?
            .remove(&json!({ "id": id }))
            .await?;
        Ok(model)
    })
}

/// `create` passes `true`: the name is then required even when absent
fn validate_params<'a>(_service: &'a Service, ctx: &'a mut Context, strict: Value) -> ActionFuture<'a> {
    Box::pin(async move {
        if strict.as_bool().unwrap_or(false) || ctx.has_param("name") {
            ctx.validate("name")
                .trim()
                .not_empty(Some("ProviderNameCannotBeEmpty"))
                .length(0, MAX_NAME_LEN, Some("ProviderNameTooLong"))
                .end();
        }

        ctx.ensure_valid()?;
        Ok(Value::Null)
    })
}
