//! # Session Establishment
//!
//! Two or more managers opening sessions through the `SecurityEntity`
//! contract, directly, through endpoints and over the loopback wire.

#[cfg(test)]
mod tests {
    use crate::fixtures::{builder, init_tracing, manager, protected_rules, test_config, Domain};
    use sec_policy::{Direction, EntityType};
    use sec_session::{
        LoopbackEntity, SecurityConfig, SecurityEndpoint, SecurityEntity, SecurityError,
        SecurityManager, SessionPhase,
    };
    use std::sync::Arc;

    type Order = (String, u32, Vec<u8>);

    fn pair() -> (Domain, Arc<SecurityManager>, Arc<SecurityManager>) {
        init_tracing();
        let domain = Domain::new("acme");
        let alice = manager(domain.member(EntityType::Runtime, "alice"), protected_rules());
        let bob = manager(domain.member(EntityType::Runtime, "bob"), protected_rules());
        (domain, Arc::new(alice), Arc::new(bob))
    }

    // =========================================================================
    // WIRE
    // =========================================================================

    #[tokio::test]
    async fn test_handshake_over_loopback_wire() {
        let (_domain, alice, bob) = pair();
        let wire = LoopbackEntity::new(bob.clone());

        let id = alice.initiate_session(&wire).await.unwrap();
        let bob_id = alice.distant_session_id(id).unwrap();

        assert!(alice.is_validated(id));
        assert!(bob.is_validated(bob_id));
        assert_eq!(alice.session_phase(id), Some(SessionPhase::SecretExchanged));
        assert!(wire.frames() >= 14);

        let order: Order = ("widgets".into(), 12, vec![1, 2, 3]);
        let sealed = alice.encrypt(id, Direction::Request, &order).await.unwrap();
        let received: Order = bob.decrypt(bob_id, Direction::Request, &sealed).await.unwrap();
        assert_eq!(received, order);

        let sealed = bob
            .encrypt_bytes(bob_id, Direction::Reply, b"accepted")
            .await
            .unwrap();
        assert_eq!(
            alice.decrypt_bytes(id, Direction::Reply, &sealed).await.unwrap(),
            b"accepted"
        );
    }

    #[tokio::test]
    async fn test_tampered_payload_rejected() {
        let (_domain, alice, bob) = pair();
        let id = alice.initiate_session(&*bob).await.unwrap();
        let bob_id = alice.distant_session_id(id).unwrap();

        let mut sealed = alice
            .encrypt_bytes(id, Direction::Request, b"pay 10")
            .await
            .unwrap();
        sealed.ciphertext[0] ^= 0x01;

        assert!(matches!(
            bob.decrypt_bytes(bob_id, Direction::Request, &sealed).await,
            Err(SecurityError::Crypto(_))
        ));
    }

    #[tokio::test]
    async fn test_responder_reuses_session_opened_by_peer() {
        let (_domain, alice, bob) = pair();
        let id = alice
            .initiate_session(&LoopbackEntity::new(bob.clone()))
            .await
            .unwrap();
        let bob_id = alice.distant_session_id(id).unwrap();

        let reverse = bob
            .initiate_session(&LoopbackEntity::new(alice.clone()))
            .await
            .unwrap();
        assert_eq!(reverse, bob_id);
        assert_eq!(alice.session_ids(), vec![id]);
        assert_eq!(bob.session_ids(), vec![bob_id]);
    }

    #[tokio::test]
    async fn test_sessions_with_several_peers_interleave() {
        let (domain, alice, bob) = pair();
        let carol = manager(domain.member(EntityType::Node, "carol"), protected_rules());

        let (with_bob, with_carol) =
            tokio::join!(alice.initiate_session(&*bob), alice.initiate_session(&carol));
        let (with_bob, with_carol) = (with_bob.unwrap(), with_carol.unwrap());

        assert_ne!(with_bob, with_carol);
        assert!(alice.is_validated(with_bob) && alice.is_validated(with_carol));
        assert_eq!(alice.session_ids().len(), 2);
        assert_eq!(
            alice.session_for(carol.identity().leaf().certificate()),
            Some(with_carol)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_simultaneous_initiation_from_both_sides() {
        let (domain, alice, bob) = pair();
        let carol = Arc::new(manager(
            domain.member(EntityType::Node, "carol"),
            protected_rules(),
        ));

        let calls = [
            (alice.clone(), bob.clone()),
            (bob.clone(), alice.clone()),
            (alice.clone(), carol.clone()),
            (carol.clone(), bob.clone()),
            (bob.clone(), carol.clone()),
            (alice.clone(), bob.clone()),
        ];
        let handles: Vec<_> = calls
            .into_iter()
            .map(|(from, to)| {
                tokio::spawn(async move {
                    let id = from.initiate_session(&*to).await;
                    (from, id)
                })
            })
            .collect();

        for handle in handles {
            let (from, id) = handle.await.unwrap();
            let id = id.unwrap();
            let sealed = from
                .encrypt_bytes(id, Direction::Request, b"hello")
                .await
                .unwrap();
            assert!(!sealed.ciphertext.is_empty());
            assert!(from.session_ids().contains(&id));
            assert!(from.is_validated(id));
        }

        for (owner, peers) in [(&alice, [&bob, &carol]), (&bob, [&alice, &carol])] {
            for peer in peers {
                let id = owner
                    .session_for(peer.identity().leaf().certificate())
                    .unwrap();
                assert!(owner.is_validated(id));
            }
        }
    }

    #[tokio::test]
    async fn test_closed_session_can_be_reopened() {
        let (_domain, alice, bob) = pair();
        let first = alice.initiate_session(&*bob).await.unwrap();
        alice.close_session(first, &*bob).await.unwrap();
        assert!(bob.session_ids().is_empty());

        let second = alice.initiate_session(&*bob).await.unwrap();
        assert!(alice.is_validated(second));
        assert_eq!(bob.session_ids().len(), 1);
    }

    // =========================================================================
    // ENDPOINTS
    // =========================================================================

    #[tokio::test]
    async fn test_forwarder_endpoint_reaches_target_manager() {
        let (_domain, alice, bob) = pair();
        let forwarder = SecurityEndpoint::Forwarder(bob.clone());

        let id = alice.initiate_session(&forwarder).await.unwrap();
        assert!(alice.is_validated(id));
        assert_eq!(bob.session_ids().len(), 1);
    }

    #[tokio::test]
    async fn test_local_endpoint_serves_its_manager() {
        let (_domain, alice, bob) = pair();
        let endpoint = SecurityEndpoint::Local(bob.clone());

        assert_eq!(
            endpoint.certificate().await.unwrap(),
            bob.certificate_public()
        );
        let id = alice.initiate_session(&endpoint).await.unwrap();
        assert!(alice.is_validated(id));
    }

    #[tokio::test]
    async fn test_disabled_endpoint_refuses_sessions() {
        let (_domain, alice, _bob) = pair();
        let err = alice
            .initiate_session(&SecurityEndpoint::Disabled)
            .await
            .unwrap_err();

        assert_eq!(err, SecurityError::SecurityNotAvailable);
        assert!(alice.session_ids().is_empty());
    }

    // =========================================================================
    // TRUST
    // =========================================================================

    #[tokio::test]
    async fn test_untrusted_peer_leaves_no_state() {
        let (_domain, alice, _bob) = pair();
        let rogue = Domain::new("rogue");
        let mallory = manager(rogue.member(EntityType::Runtime, "mallory"), protected_rules());

        assert!(matches!(
            alice.initiate_session(&mallory).await,
            Err(SecurityError::UntrustedCertificate(_))
        ));
        assert!(matches!(
            mallory.initiate_session(&*alice).await,
            Err(SecurityError::UntrustedCertificate(_))
        ));
        assert!(alice.session_ids().is_empty());
        assert!(mallory.session_ids().is_empty());
    }

    #[tokio::test]
    async fn test_anchor_check_can_be_disabled() {
        init_tracing();
        let acme = Domain::new("acme");
        let rogue = Domain::new("rogue");
        let lenient = SecurityConfig {
            require_trust_anchor: false,
            ..test_config()
        };
        let alice = builder(acme.member(EntityType::Runtime, "alice"))
            .config(lenient.clone())
            .policy_server(protected_rules())
            .build()
            .unwrap();
        let mallory = builder(rogue.member(EntityType::Runtime, "mallory"))
            .config(lenient)
            .policy_server(protected_rules())
            .build()
            .unwrap();

        let id = alice.initiate_session(&mallory).await.unwrap();
        assert!(alice.is_validated(id));
    }
}
