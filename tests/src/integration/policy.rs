//! # Policy Resolution End to End
//!
//! Rule sets driving real sessions: wildcard rules, domain-specific rules
//! outranking them, default denial and rules loaded from a policy file.

#[cfg(test)]
mod tests {
    use crate::fixtures::{any_entity, init_tracing, manager, protected_rules, Domain};
    use sec_policy::{
        Authorization, CertificateDirectory, Communication, Entities, EntityType, PolicyDocument,
        PolicyRule, PolicyServer,
    };
    use sec_session::SecurityError;
    use std::io::Write;

    #[tokio::test]
    async fn test_entity_wildcard_lets_objects_talk() {
        init_tracing();
        let domain = Domain::new("acme");
        let left = manager(domain.member(EntityType::Object, "ao-left"), protected_rules());
        let right = manager(domain.member(EntityType::Object, "ao-right"), protected_rules());

        let id = left.initiate_session(&right).await.unwrap();
        assert!(left.is_validated(id));
        assert_eq!(
            *left.session_context(id).unwrap().request(),
            Communication::protected()
        );
    }

    #[tokio::test]
    async fn test_domain_rule_outranks_wildcard() {
        init_tracing();
        let acme = Domain::new("acme");
        let rules = PolicyServer::new(vec![
            PolicyRule::new(
                any_entity(),
                any_entity(),
                Communication::permissive(),
                Communication::permissive(),
            ),
            PolicyRule::new(
                acme.pattern(),
                any_entity(),
                Communication::protected(),
                Communication::permissive(),
            ),
        ]);
        let alice = manager(acme.member(EntityType::Runtime, "alice"), rules);
        let peer = Entities::new(vec![acme
            .member(EntityType::Runtime, "bob")
            .no_private_key()]);

        let context = alice
            .get_policy(alice.local_entities(), &peer)
            .await
            .unwrap();
        assert_eq!(*context.request(), Communication::protected());
        assert_eq!(*context.reply(), Communication::permissive());
    }

    #[tokio::test]
    async fn test_peer_without_rules_refuses() {
        init_tracing();
        let domain = Domain::new("acme");
        let alice = manager(domain.member(EntityType::Runtime, "alice"), protected_rules());
        let bob = manager(
            domain.member(EntityType::Runtime, "bob"),
            PolicyServer::default(),
        );

        assert!(matches!(
            alice.initiate_session(&bob).await,
            Err(SecurityError::CommunicationForbidden(_))
        ));
        assert!(matches!(
            bob.initiate_session(&alice).await,
            Err(SecurityError::CommunicationForbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_rules_added_at_runtime_take_effect() {
        init_tracing();
        let domain = Domain::new("acme");
        let admin = domain.member(EntityType::User, "admin");
        let alice = manager(
            domain.member(EntityType::Runtime, "alice"),
            PolicyServer::default(),
        );
        let bob = manager(domain.member(EntityType::Runtime, "bob"), protected_rules());

        assert!(alice.initiate_session(&bob).await.is_err());

        alice
            .add_policy_rule(
                admin.leaf().certificate(),
                PolicyRule::new(
                    any_entity(),
                    any_entity(),
                    Communication::protected(),
                    Communication::protected(),
                ),
            )
            .unwrap();
        let id = alice.initiate_session(&bob).await.unwrap();
        assert!(alice.is_validated(id));
    }

    const POLICY_FILE: &str = r#"
[[Policy.Rules.Rule]]
Migration = "denied"
OACreation = "authorized"

[[Policy.Rules.Rule.From.Entity]]
type = "domain"
name = "domain:acme"

[[Policy.Rules.Rule.To.Entity]]
type = "entity"

[Policy.Rules.Rule.Communication.Request]
value = "authorized"
[Policy.Rules.Rule.Communication.Request.Attributes]
authentication = "required"
integrity = "required"
confidentiality = "optional"

[Policy.Rules.Rule.Communication.Reply]
value = "authorized"
[Policy.Rules.Rule.Communication.Reply.Attributes]
authentication = "required"
integrity = "required"
confidentiality = "optional"
"#;

    #[tokio::test]
    async fn test_policy_loaded_from_file_drives_session() {
        init_tracing();
        let acme = Domain::new("acme");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(POLICY_FILE.as_bytes()).unwrap();

        let mut directory = CertificateDirectory::new();
        directory.insert(acme.certificate.certificate().clone());
        let rules = PolicyDocument::load(file.path())
            .unwrap()
            .to_rules(&directory)
            .unwrap();
        assert_eq!(rules.len(), 1);

        let alice = manager(
            acme.member(EntityType::Runtime, "alice"),
            PolicyServer::new(rules.clone()),
        );
        let bob = manager(acme.member(EntityType::Runtime, "bob"), PolicyServer::new(rules));

        let id = alice.initiate_session(&bob).await.unwrap();
        let agreed = alice.session_context(id).unwrap();
        assert_eq!(agreed.request().authentication(), Authorization::Required);
        assert_eq!(agreed.request().confidentiality(), Authorization::Optional);
        assert!(!agreed.migration());
        assert!(agreed.ao_creation());
    }
}
