//! Idempotent user-group operations layered on [`Connection`].
//!
//! # Design
//! Every mutation is preceded by a name lookup so that repeated invocations
//! converge: create reports a conflict instead of failing server-side,
//! update skips the write when the name already matches, delete reports a
//! missing group instead of guessing. The lookup itself treats "not found"
//! as `None`, never as an error, keeping the check-before-mutate path
//! branch-free for callers.
//!
//! All business-error classification lives here: a 403 from any call becomes
//! [`Error::InsufficientPrivileges`], race conditions detected through the
//! server's error message become the specific group kinds, and everything
//! else is wrapped as [`Error::UnexpectedResponse`].

use tracing::debug;

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::types::{CallResult, Group, Payload};

const SEARCH: &str = "/api/user_groups/search";
const CREATE: &str = "/api/user_groups/create";
const UPDATE: &str = "/api/user_groups/update";
const DELETE: &str = "/api/user_groups/delete";

/// User-group resource bound to a connection. Obtained via
/// [`Connection::groups`].
#[derive(Debug)]
pub struct Groups<'a> {
    conn: &'a Connection,
}

impl<'a> Groups<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Groups { conn }
    }

    /// All groups on the server.
    pub fn list(&self) -> Result<Vec<Group>> {
        let result = self.conn.get(SEARCH, &[]).map_err(classify)?;
        parse_groups(&result)
    }

    /// Resolve a group id by exact name match.
    ///
    /// The server's `q` parameter is a fuzzy filter; only an exact match
    /// counts. Absent is `None`, not an error.
    pub fn find_id_by_name(&self, name: &str) -> Result<Option<String>> {
        let result = self.conn.get(SEARCH, &[("q", name)]).map_err(classify)?;
        let groups = parse_groups(&result)?;
        Ok(groups.into_iter().find(|g| g.name == name).map(|g| g.id))
    }

    /// Create a group, failing with [`Error::GroupAlreadyExists`] when a
    /// group of that name is already present.
    pub fn create(&self, name: &str, description: Option<&str>) -> Result<CallResult> {
        if self.find_id_by_name(name)?.is_some() {
            return Err(already_exists(name));
        }

        let mut form = vec![("name", name)];
        if let Some(description) = description {
            form.push(("description", description));
        }
        // A concurrent actor may have created the group between the check
        // and the POST; the server's conflict message is mapped back to the
        // specific kind.
        let mut result = self.conn.post(CREATE, &form).map_err(|err| {
            if mentions(&err, "already exists") {
                already_exists(name)
            } else {
                classify(err)
            }
        })?;
        debug!(name, "group created");
        result.changed = true;
        Ok(result)
    }

    /// Rename the group `id` to `new_name`.
    ///
    /// When `new_name` already resolves to `id` the server is not called and
    /// the result reports `changed: false`.
    pub fn update(&self, id: &str, new_name: &str) -> Result<CallResult> {
        if self.find_id_by_name(new_name)?.as_deref() == Some(id) {
            return Ok(CallResult {
                changed: false,
                message: Some("Group already has the desired name".to_string()),
                payload: Payload::Empty,
            });
        }

        let mut result = self
            .conn
            .post(UPDATE, &[("id", id), ("name", new_name)])
            .map_err(classify)?;
        debug!(id, new_name, "group renamed");
        result.changed = true;
        Ok(result)
    }

    /// Delete the group named `name`, failing with [`Error::GroupNotFound`]
    /// when no such group exists.
    pub fn delete(&self, name: &str) -> Result<CallResult> {
        let id = self
            .find_id_by_name(name)?
            .ok_or_else(|| not_found(name))?;

        // Same race window as create: the group may vanish between lookup
        // and delete.
        let mut result = self.conn.post(DELETE, &[("id", id.as_str())]).map_err(|err| {
            if mentions(&err, "not found") || mentions(&err, "does not exist") {
                not_found(name)
            } else {
                classify(err)
            }
        })?;
        debug!(name, id = %id, "group deleted");
        result.changed = true;
        Ok(result)
    }
}

fn already_exists(name: &str) -> Error {
    Error::GroupAlreadyExists(format!("Group '{name}' already exists."))
}

fn not_found(name: &str) -> Error {
    Error::GroupNotFound(format!("Group with name '{name}' not found."))
}

/// Uniform classification of connection failures: 403 means the token lacks
/// privileges, already-specific kinds pass through, anything else is an
/// unexpected response.
fn classify(err: Error) -> Error {
    match err {
        Error::UnexpectedStatus { actual: 403, .. } => Error::InsufficientPrivileges(
            "Insufficient privileges to perform this action. Please check the token permissions."
                .to_string(),
        ),
        err @ (Error::InsufficientPrivileges(_)
        | Error::GroupNotFound(_)
        | Error::GroupAlreadyExists(_)) => err,
        other => Error::UnexpectedResponse(other.to_string()),
    }
}

fn mentions(err: &Error, needle: &str) -> bool {
    err.to_string().contains(needle)
}

fn parse_groups(result: &CallResult) -> Result<Vec<Group>> {
    let json = result.payload.as_json().ok_or_else(|| {
        Error::UnexpectedResponse("search response body was not JSON".to_string())
    })?;
    let groups = json.get("groups").ok_or_else(|| {
        Error::UnexpectedResponse("search response is missing the 'groups' key".to_string())
    })?;
    serde_json::from_value(groups.clone())
        .map_err(|e| Error::UnexpectedResponse(format!("malformed 'groups' array: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;
    use crate::transport::testing::FakeTransport;

    const BASE: &str = "http://localhost:9000";
    const FORBIDDEN: &str = r#"{"errors":[{"msg":"Insufficient privileges"}]}"#;

    fn connection(fake: &FakeTransport) -> Connection {
        Connection::with_transport(BASE, "squ_token", Box::new(fake.clone())).unwrap()
    }

    fn search_body(entries: &[(&str, &str)]) -> String {
        let groups: Vec<serde_json::Value> = entries
            .iter()
            .map(|(id, name)| serde_json::json!({"id": id, "name": name}))
            .collect();
        serde_json::json!({ "groups": groups }).to_string()
    }

    #[test]
    fn list_parses_the_groups_array() {
        let fake = FakeTransport::new();
        fake.push_response(200, &search_body(&[("1", "dev"), ("2", "qa")]));
        let conn = connection(&fake);

        let groups = conn.groups().list().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "dev");
        assert_eq!(groups[1].id, "2");
        assert!(fake.calls()[0].query.is_empty());
    }

    #[test]
    fn list_maps_403_to_insufficient_privileges() {
        let fake = FakeTransport::new();
        fake.push_response(403, FORBIDDEN);
        let conn = connection(&fake);

        let err = conn.groups().list().unwrap_err();
        assert!(matches!(err, Error::InsufficientPrivileges(_)));
    }

    #[test]
    fn list_wraps_a_malformed_body_as_unexpected_response() {
        let fake = FakeTransport::new();
        fake.push_response(200, r#"{"paging":{"total":0}}"#);
        let conn = connection(&fake);

        let err = conn.groups().list().unwrap_err();
        assert!(matches!(err, Error::UnexpectedResponse(_)));
    }

    #[test]
    fn find_id_requires_an_exact_match_among_fuzzy_results() {
        let fake = FakeTransport::new();
        // The server's q filter is a substring match and returns all three.
        fake.push_response(
            200,
            &search_body(&[("1", "dev-ops"), ("2", "dev"), ("3", "devs")]),
        );
        let conn = connection(&fake);

        let id = conn.groups().find_id_by_name("dev").unwrap();
        assert_eq!(id.as_deref(), Some("2"));
        assert_eq!(
            fake.calls()[0].query,
            vec![("q".to_string(), "dev".to_string())]
        );
    }

    #[test]
    fn find_id_returns_none_without_an_exact_match() {
        let fake = FakeTransport::new();
        fake.push_response(200, &search_body(&[("1", "dev-ops"), ("3", "devs")]));
        let conn = connection(&fake);

        assert!(conn.groups().find_id_by_name("dev").unwrap().is_none());
    }

    #[test]
    fn create_fails_when_the_name_is_taken() {
        let fake = FakeTransport::new();
        fake.push_response(200, &search_body(&[("1", "dev")]));
        let conn = connection(&fake);

        let err = conn.groups().create("dev", None).unwrap_err();
        assert!(matches!(err, Error::GroupAlreadyExists(_)));
        // The POST never happened.
        assert_eq!(fake.call_count(), 1);
    }

    #[test]
    fn create_posts_name_and_description_and_stamps_changed() {
        let fake = FakeTransport::new();
        fake.push_response(200, &search_body(&[]));
        fake.push_response(
            200,
            r#"{"group":{"id":"2","name":"qa","description":"QA team"}}"#,
        );
        let conn = connection(&fake);

        let result = conn.groups().create("qa", Some("QA team")).unwrap();
        assert!(result.changed);
        let json = result.payload.as_json().unwrap();
        assert_eq!(json["group"]["id"], "2");

        let post = &fake.calls()[1];
        assert_eq!(post.method, HttpMethod::Post);
        assert_eq!(post.url, format!("{BASE}/api/user_groups/create"));
        assert_eq!(
            post.form,
            vec![
                ("name".to_string(), "qa".to_string()),
                ("description".to_string(), "QA team".to_string()),
            ]
        );
    }

    #[test]
    fn create_omits_a_missing_description() {
        let fake = FakeTransport::new();
        fake.push_response(200, &search_body(&[]));
        fake.push_response(200, r#"{"group":{"id":"2","name":"qa"}}"#);
        let conn = connection(&fake);

        conn.groups().create("qa", None).unwrap();
        assert_eq!(
            fake.calls()[1].form,
            vec![("name".to_string(), "qa".to_string())]
        );
    }

    #[test]
    fn create_race_is_reported_as_already_exists() {
        let fake = FakeTransport::new();
        fake.push_response(200, &search_body(&[]));
        fake.push_response(400, r#"{"errors":[{"msg":"Group 'qa' already exists"}]}"#);
        let conn = connection(&fake);

        let err = conn.groups().create("qa", None).unwrap_err();
        assert!(matches!(err, Error::GroupAlreadyExists(_)));
    }

    #[test]
    fn create_wraps_other_post_failures() {
        let fake = FakeTransport::new();
        fake.push_response(200, &search_body(&[]));
        fake.push_response(500, r#"{"errors":[{"msg":"database unavailable"}]}"#);
        let conn = connection(&fake);

        let err = conn.groups().create("qa", None).unwrap_err();
        assert!(matches!(err, Error::UnexpectedResponse(_)));
    }

    #[test]
    fn update_short_circuits_when_the_name_already_matches() {
        let fake = FakeTransport::new();
        fake.push_response(200, &search_body(&[("1", "dev")]));
        let conn = connection(&fake);

        let result = conn.groups().update("1", "dev").unwrap();
        assert!(!result.changed);
        assert_eq!(
            result.message.as_deref(),
            Some("Group already has the desired name")
        );
        // Exactly the lookup, no write.
        assert_eq!(fake.call_count(), 1);
    }

    #[test]
    fn update_posts_id_and_name_when_different() {
        let fake = FakeTransport::new();
        fake.push_response(200, &search_body(&[]));
        fake.push_response(200, r#"{"group":{"id":"1","name":"platform"}}"#);
        let conn = connection(&fake);

        let result = conn.groups().update("1", "platform").unwrap();
        assert!(result.changed);
        assert_eq!(
            fake.calls()[1].form,
            vec![
                ("id".to_string(), "1".to_string()),
                ("name".to_string(), "platform".to_string()),
            ]
        );
    }

    #[test]
    fn update_wraps_post_failures() {
        let fake = FakeTransport::new();
        fake.push_response(200, &search_body(&[]));
        fake.push_response(404, r#"{"errors":[{"msg":"Group with id '9' not found"}]}"#);
        let conn = connection(&fake);

        let err = conn.groups().update("9", "platform").unwrap_err();
        assert!(matches!(err, Error::UnexpectedResponse(_)));
    }

    #[test]
    fn delete_fails_when_the_group_is_absent() {
        let fake = FakeTransport::new();
        fake.push_response(200, &search_body(&[]));
        let conn = connection(&fake);

        let err = conn.groups().delete("ghost").unwrap_err();
        assert!(matches!(err, Error::GroupNotFound(_)));
        assert_eq!(fake.call_count(), 1);
    }

    #[test]
    fn delete_resolves_the_id_then_posts() {
        let fake = FakeTransport::new();
        fake.push_response(200, &search_body(&[("2", "qa")]));
        fake.push_response(200, "");
        let conn = connection(&fake);

        let result = conn.groups().delete("qa").unwrap();
        assert!(result.changed);
        assert_eq!(result.payload, Payload::Empty);
        let post = &fake.calls()[1];
        assert_eq!(post.url, format!("{BASE}/api/user_groups/delete"));
        assert_eq!(post.form, vec![("id".to_string(), "2".to_string())]);
    }

    #[test]
    fn delete_race_is_reported_as_not_found() {
        let fake = FakeTransport::new();
        fake.push_response(200, &search_body(&[("2", "qa")]));
        fake.push_response(404, r#"{"errors":[{"msg":"Group with id '2' not found"}]}"#);
        let conn = connection(&fake);

        let err = conn.groups().delete("qa").unwrap_err();
        assert!(matches!(err, Error::GroupNotFound(_)));
    }

    #[test]
    fn a_403_during_any_operation_surfaces_as_insufficient_privileges() {
        for op in ["create", "update", "delete", "find"] {
            let fake = FakeTransport::new();
            fake.push_response(403, FORBIDDEN);
            let conn = connection(&fake);
            let groups = conn.groups();

            let err = match op {
                "create" => groups.create("dev", None).unwrap_err(),
                "update" => groups.update("1", "dev").unwrap_err(),
                "delete" => groups.delete("dev").unwrap_err(),
                _ => groups.find_id_by_name("dev").unwrap_err(),
            };
            assert!(
                matches!(err, Error::InsufficientPrivileges(_)),
                "{op}: {err:?}"
            );
        }
    }

    #[test]
    fn transport_failures_become_unexpected_response() {
        let fake = FakeTransport::new();
        fake.push_failure("connection refused");
        let conn = connection(&fake);

        let err = conn.groups().list().unwrap_err();
        match err {
            Error::UnexpectedResponse(msg) => assert!(msg.contains("connection refused")),
            other => panic!("expected UnexpectedResponse, got {other:?}"),
        }
    }

    // End-to-end sequence: server seeded with [{id:"1", name:"dev"}].
    #[test]
    fn create_then_delete_scenario() {
        let fake = FakeTransport::new();
        let conn = connection(&fake);
        let groups = conn.groups();

        // createGroup("dev") → already exists.
        fake.push_response(200, &search_body(&[("1", "dev")]));
        assert!(matches!(
            groups.create("dev", None).unwrap_err(),
            Error::GroupAlreadyExists(_)
        ));

        // createGroup("qa") → created, changed=true.
        fake.push_response(200, &search_body(&[]));
        fake.push_response(200, r#"{"group":{"id":"2","name":"qa"}}"#);
        let created = groups.create("qa", None).unwrap();
        assert!(created.changed);

        // deleteGroup("qa") → resolves id 2, changed=true.
        fake.push_response(200, &search_body(&[("2", "qa")]));
        fake.push_response(200, "");
        let deleted = groups.delete("qa").unwrap();
        assert!(deleted.changed);

        // deleteGroup("qa") again → not found.
        fake.push_response(200, &search_body(&[]));
        assert!(matches!(
            groups.delete("qa").unwrap_err(),
            Error::GroupNotFound(_)
        ));
    }
}
