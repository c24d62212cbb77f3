//! # Manager Hierarchies
//!
//! A runtime's manager delegates to the manager of the node that hosts it.
//! The node's policy constrains every runtime below it, and identities
//! minted by a manager inherit its place in the hierarchy.

#[cfg(test)]
mod tests {
    use crate::fixtures::{
        builder, init_tracing, manager, protected_rules, rules_between_any, Domain,
    };
    use sec_policy::{
        Authorization, Axis, Communication, Direction, Entities, EntityType, PolicyServer,
    };
    use sec_session::{SecurityEntity, SecurityError, SecurityManager};
    use std::sync::Arc;

    struct Site {
        domain: Domain,
        node: Arc<SecurityManager>,
    }

    impl Site {
        fn new(node_rules: PolicyServer) -> Self {
            init_tracing();
            let domain = Domain::new("acme");
            let node = manager(domain.member(EntityType::Node, "node-1"), node_rules);
            Self {
                domain,
                node: Arc::new(node),
            }
        }

        /// Runtime hosted on the node, optionally with its own rules.
        fn runtime(&self, name: &str, rules: Option<PolicyServer>) -> SecurityManager {
            let identity = self
                .node
                .generate_sibling_certificate(EntityType::Runtime, name)
                .unwrap();
            let mut runtime = builder(identity)
                .container(self.node.identity().clone())
                .parent(self.node.clone());
            if let Some(rules) = rules {
                runtime = runtime.policy_server(rules);
            }
            runtime.build().unwrap()
        }

        fn stranger(&self) -> Entities {
            Entities::new(vec![self
                .domain
                .member(EntityType::Runtime, "stranger")
                .no_private_key()])
        }
    }

    fn permissive_rules() -> PolicyServer {
        rules_between_any(Communication::permissive(), Communication::permissive())
    }

    #[tokio::test]
    async fn test_parent_tightens_child_policy() {
        let site = Site::new(protected_rules());
        let runtime = site.runtime("rt-1", Some(permissive_rules()));

        let context = runtime
            .get_policy(runtime.local_entities(), &site.stranger())
            .await
            .unwrap();

        for axis in [Axis::Authentication, Axis::Confidentiality, Axis::Integrity] {
            assert_eq!(context.request().axis(axis), Authorization::Required);
            assert_eq!(context.reply().axis(axis), Authorization::Required);
        }
        assert!(context.request().is_allowed());
    }

    #[tokio::test]
    async fn test_runtime_without_rules_uses_node_policy() {
        let site = Site::new(protected_rules());
        let runtime = site.runtime("rt-1", None);
        let stranger = site.stranger();

        let inherited = runtime
            .get_policy(runtime.local_entities(), &stranger)
            .await
            .unwrap();
        let direct = site
            .node
            .policy(runtime.local_entities().clone(), stranger)
            .await
            .unwrap();

        assert_eq!(inherited, direct);
    }

    #[tokio::test]
    async fn test_node_without_rules_forbids_everything_below() {
        let site = Site::new(PolicyServer::default());
        let alpha = site.runtime("rt-a", Some(permissive_rules()));
        let beta = site.runtime("rt-b", Some(permissive_rules()));

        let context = alpha
            .get_policy(alpha.local_entities(), beta.local_entities())
            .await
            .unwrap();
        assert!(context.is_everything_forbidden());

        assert!(matches!(
            alpha.initiate_session(&beta).await,
            Err(SecurityError::CommunicationForbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_parent_and_child_conflict() {
        let no_confidentiality = rules_between_any(
            Communication::permissive().with_axis(Axis::Confidentiality, Authorization::Denied),
            Communication::permissive(),
        );
        let site = Site::new(no_confidentiality);
        let runtime = site.runtime("rt-1", Some(protected_rules()));

        assert!(matches!(
            runtime
                .get_policy(runtime.local_entities(), &site.stranger())
                .await,
            Err(SecurityError::IncompatiblePolicy(_))
        ));
    }

    #[tokio::test]
    async fn test_runtimes_on_one_node_talk_under_node_policy() {
        let site = Site::new(protected_rules());
        let alpha = site.runtime("rt-a", Some(permissive_rules()));
        let beta = site.runtime("rt-b", None);

        let id = alpha.initiate_session(&beta).await.unwrap();
        let beta_id = alpha.distant_session_id(id).unwrap();

        let agreed = alpha.session_context(id).unwrap();
        assert_eq!(agreed.request().integrity(), Authorization::Required);
        assert!(beta.is_validated(beta_id));

        let sealed = alpha
            .encrypt(id, Direction::Request, "status?")
            .await
            .unwrap();
        let question: String = beta
            .decrypt(beta_id, Direction::Request, &sealed)
            .await
            .unwrap();
        assert_eq!(question, "status?");
    }

    #[tokio::test]
    async fn test_minted_object_reaches_node() {
        let site = Site::new(protected_rules());
        let object = site
            .node
            .generate_sibling_certificate(EntityType::Object, "ao-7")
            .unwrap();
        assert!(object.contains(site.node.identity().leaf().certificate()));
        assert!(object.verify_chain().is_ok());

        let object = manager(object, protected_rules());
        let id = object.initiate_session(&*site.node).await.unwrap();
        assert!(object.is_validated(id));
        assert_eq!(
            site.node.session_for(object.identity().leaf().certificate()),
            object.distant_session_id(id)
        );
    }
}
