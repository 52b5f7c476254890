use architect_models::query::{translate_scope, FilterOperator, QueryPlanStep};
use architect_models::relation::JoinRef;
use architect_models::{
    convert_schema, from_json_str, resolve, translate_query, AllowedKeys, AppError, ConvertOptions,
    ModelRegistry, QueryError, QuerySpec, ResolvedModels, Settings,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};

const MODELS: &str = r#"{
    "models": [
        {
            "name": "User",
            "tableName": "users",
            "timestamps": true,
            "properties": {
                "firstName": { "type": "string", "required": true },
                "lastName": "string",
                "nickname": { "type": "string", "nullable": true }
            },
            "relations": {
                "messages": { "relation": "hasMany", "from": "User.id", "to": "Message.userId" },
                "profile": { "relation": "hasOne", "from": "User.id", "to": "Profile.userId" },
                "groups": { "relation": "manyToMany", "from": "User.id", "to": "Group.id", "scope": "visible" }
            }
        },
        {
            "name": "Message",
            "properties": { "text": "text", "unread": "boolean", "userId": "integer" },
            "relations": {
                "author": { "relation": "belongsTo", "from": "Message.userId", "to": "User.id" }
            }
        },
        {
            "name": "Profile",
            "properties": { "city": "string", "userId": "integer" }
        },
        {
            "name": "Group",
            "tableName": "groups",
            "properties": { "title": "string" },
            "scopes": { "visible": { "order": "title" } },
            "relations": {
                "members": {
                    "relation": "manyToMany",
                    "from": "Group.id",
                    "to": "User.id",
                    "inverse": true
                }
            }
        }
    ]
}"#;

fn models() -> ResolvedModels {
    let config = from_json_str(MODELS).unwrap();
    resolve(&config, &Settings::default()).unwrap()
}

fn params(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

#[test]
fn forward_references_resolve_in_two_passes() {
    let models = models();
    let user = models.get("User").unwrap();
    assert_eq!(user.relations["messages"].related_model, "Message");
    assert_eq!(models.lookup_model("Group").unwrap().table_name, "groups");
    let names: Vec<_> = models.names().collect();
    let position = |name: &str| names.iter().position(|n| *n == name).unwrap();
    assert!(position("User") < position("Message"));
    assert!(position("User") < position("Profile"));
}

#[test]
fn inverse_many_to_many_shares_the_join_table() {
    let models = models();
    let groups = models.get("User").unwrap().relations["groups"].join.through.clone().unwrap();
    let members = models.get("Group").unwrap().relations["members"].join.through.clone().unwrap();
    assert_eq!(groups.table, "UserGroup");
    assert_eq!(members.table, "UserGroup");
    assert_eq!(groups.from, members.to);
    assert_eq!(groups.to, members.from);
    assert_eq!(groups.from, JoinRef::Single("UserGroup.userId".into()));
}

#[test]
fn compiled_schema_has_relation_properties() {
    let models = models();
    let schema = models.schema("User").unwrap();
    assert_eq!(schema["required"], json!(["firstName"]));
    assert_eq!(schema["properties"]["nickname"]["type"], json!(["null", "string"]));
    assert_eq!(schema["properties"]["profile"]["anyOf"][0], json!({ "type": "null" }));
    assert_eq!(schema["properties"]["messages"]["type"], "array");
    assert_eq!(
        schema["properties"]["groups"]["items"]["anyOf"][1],
        json!({ "$ref": "Group" })
    );
}

#[test]
fn nullable_rewrites() {
    let options = ConvertOptions::default();
    assert_eq!(
        convert_schema(&json!({ "type": "integer", "nullable": true, "unsigned": true }), &options)
            .unwrap(),
        json!({ "type": ["null", "integer"], "nullable": true, "unsigned": true })
    );
    assert_eq!(
        convert_schema(&json!({ "type": "string", "nullable": true, "format": "email" }), &options)
            .unwrap(),
        json!({
            "anyOf": [{ "type": "null" }, { "type": "string", "format": "email" }],
            "nullable": true
        })
    );
    assert_eq!(
        convert_schema(&json!({ "type": "User", "nullable": true }), &options).unwrap(),
        json!({ "anyOf": [{ "type": "null" }, { "$ref": "User" }], "nullable": true })
    );
}

#[test]
fn where_filters_follow_relations() {
    let models = models();
    let plan = translate_query(
        &params(json!({ "where": { "firstName": { "like": "Jo%" }, "messages": { "unread": true } } })),
        &AllowedKeys::all(),
        "User",
        &models,
    )
    .unwrap();
    let mut spec = QuerySpec::default();
    plan.apply(&mut spec);
    assert_eq!(spec.filters.len(), 2);
    assert_eq!(spec.filters[0].reference, "firstName");
    assert_eq!(spec.filters[0].operator, FilterOperator::Like);
    assert_eq!(spec.filters[1].reference, "messages.unread");
    assert_eq!(spec.filters[1].value, json!(true));
}

#[test]
fn where_keys_may_carry_operators() {
    let models = models();
    let translate = |value: Value| {
        let plan = translate_query(&params(value), &AllowedKeys::all(), "User", &models).unwrap();
        let mut spec = QuerySpec::default();
        plan.apply(&mut spec);
        spec.filters
    };
    let keyed = translate(json!({ "where": { "firstName like": "Jo%" } }));
    assert_eq!(keyed, translate(json!({ "where": "firstName like=Jo%" })));
    assert_eq!(keyed[0].operator, FilterOperator::Like);

    let nested = translate(json!({ "where": { "messages": { "text like": "%hi%" } } }));
    assert_eq!(nested[0].reference, "messages.text");
    assert_eq!(nested[0].operator, FilterOperator::Like);
}

#[test]
fn scopes_are_declared_per_model() {
    let models = models();
    assert!(models.get("User").unwrap().scope("timeStamped").is_some());
    let plan = translate_scope("User", "timeStamped", &models).unwrap();
    assert!(matches!(&plan.steps[0], QueryPlanStep::Select { expression } if expression == "users.createdAt"));

    let err = translate_query(&params(json!({ "scope": "hidden" })), &AllowedKeys::all(), "Group", &models)
        .unwrap_err();
    assert_eq!(err.to_string(), "unknown scope 'hidden' on model 'Group'");
}

#[test]
fn ordering_through_to_many_relations_fails() {
    let models = models();
    let err = translate_query(
        &params(json!({ "order": "messages.text desc" })),
        &AllowedKeys::all(),
        "User",
        &models,
    )
    .unwrap_err();
    assert_eq!(err, QueryError::OrderThroughRelation("messages.text desc".into()));

    let plan = translate_query(
        &params(json!({ "order": "profile.city desc" })),
        &AllowedKeys::all(),
        "User",
        &models,
    )
    .unwrap();
    assert!(matches!(&plan.steps[0], QueryPlanStep::Select { expression } if expression == "profile.city as profileCity"));
}

#[test]
fn ranges_and_pick_expressions() {
    let models = models();
    let translate = |value: Value| translate_query(&params(value), &AllowedKeys::all(), "User", &models);
    assert_eq!(
        translate(json!({ "range": "5,10" })).unwrap(),
        translate(json!({ "range": [5, 10] })).unwrap()
    );
    let err = translate(json!({ "range": "10,5" })).unwrap_err();
    assert_eq!(AppError::from(err).status().as_u16(), 400);

    let plan = translate(json!({ "pick": "User[id,firstName],Message[id,text]" })).unwrap();
    let mut spec = QuerySpec::default();
    plan.apply(&mut spec);
    assert_eq!(spec.pick["User"], vec!["id", "firstName"]);
    assert_eq!(spec.pick["Message"], vec!["id", "text"]);

    assert_eq!(
        translate(json!({ "pick": "Ghost[id]" })).unwrap_err().to_string(),
        "invalid reference to model 'Ghost' in 'pick=Ghost[id]'"
    );
}
