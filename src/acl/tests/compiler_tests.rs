//! Policy compiler integration tests
//!
//! Covers cache hit/miss orchestration, provider merging and the build-time
//! error taxonomy.

mod common;

use common::{init_tracing, site_resources, site_roles, site_rules, Counting, RecordingCache};
use cretoai_acl::cache::MemoryCache;
use cretoai_acl::provider::{ConfigResourceProvider, FnProvider, StaticProvider};
use cretoai_acl::{
    AclError, CacheBackend, EvalContext, PolicyCompiler, ResourceEntry, RoleEntry, Rule,
};
use serde_json::json;
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn site_compiler(cache: Arc<dyn CacheBackend>) -> PolicyCompiler {
    PolicyCompiler::builder("site-acl")
        .role_provider(StaticProvider::new("roles", site_roles()))
        .resource_provider(StaticProvider::new("resources", site_resources()))
        .rule_provider(StaticProvider::new("rules", site_rules()))
        .cache(cache)
        .build()
}

// ============================================================================
// CACHE ORCHESTRATION
// ============================================================================

#[test]
fn test_cache_hit_skips_building() {
    init_tracing();
    let backend: Arc<dyn CacheBackend> = Arc::new(MemoryCache::new());
    let warm = site_compiler(backend.clone()).compile().unwrap();

    let (roles, role_calls) = Counting::new("roles", site_roles());
    let (resources, resource_calls) = Counting::new("resources", site_resources());
    let (rules, rule_calls) = Counting::new("rules", site_rules());
    let compiler = PolicyCompiler::builder("site-acl")
        .role_provider(roles)
        .resource_provider(resources)
        .rule_provider(rules)
        .cache(backend)
        .build();

    let policy = compiler.compiled_policy().unwrap();

    assert!(Arc::ptr_eq(&policy, &warm), "cached instance should be adopted");
    assert_eq!(role_calls.load(Ordering::SeqCst), 0);
    assert_eq!(resource_calls.load(Ordering::SeqCst), 0);
    assert_eq!(rule_calls.load(Ordering::SeqCst), 0);

    let stats = compiler.cache_stats().unwrap();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 0);
}

#[test]
fn test_cache_miss_builds_and_stores_once() {
    init_tracing();
    let cache = Arc::new(RecordingCache::new());

    let (roles, role_calls) = Counting::new("roles", site_roles());
    let (resources, resource_calls) = Counting::new("resources", site_resources());
    let (rules, rule_calls) = Counting::new("rules", site_rules());
    let compiler = PolicyCompiler::builder("site-acl")
        .role_provider(roles)
        .resource_provider(resources)
        .rule_provider(rules)
        .cache(cache.clone())
        .build();

    let policy = compiler.compiled_policy().unwrap();
    // Memoized: further access neither rebuilds nor rewrites
    let again = compiler.compiled_policy().unwrap();

    assert!(Arc::ptr_eq(&policy, &again));
    assert_eq!(role_calls.load(Ordering::SeqCst), 1);
    assert_eq!(resource_calls.load(Ordering::SeqCst), 1);
    assert_eq!(rule_calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.written_keys(), vec!["site-acl".to_string()]);

    let stored = cache.get_item("site-acl").unwrap().unwrap();
    assert!(Arc::ptr_eq(&stored, &policy));
}

#[test]
fn test_compiler_without_cache_always_builds() {
    let (roles, role_calls) = Counting::new("roles", site_roles());
    let compiler = PolicyCompiler::builder("uncached")
        .role_provider(roles)
        .resource_provider(StaticProvider::new("resources", site_resources()))
        .rule_provider(StaticProvider::new("rules", site_rules()))
        .build();

    compiler.compile().unwrap();
    compiler.compile().unwrap();

    assert_eq!(role_calls.load(Ordering::SeqCst), 2);
    assert!(compiler.cache_stats().is_none());
}

#[test]
fn test_build_failure_writes_nothing() {
    let cache = Arc::new(RecordingCache::new());
    let compiler = PolicyCompiler::builder("broken")
        .role_provider(StaticProvider::new("roles", vec![RoleEntry::new("guest")]))
        .resource_provider(StaticProvider::new("resources", vec![ResourceEntry::new("docs")]))
        .rule_provider(StaticProvider::new("rules", vec![Rule::allow("ghost", "docs", "read")]))
        .cache(cache.clone())
        .build();

    assert!(compiler.compiled_policy().is_err());
    assert!(cache.written_keys().is_empty());
}

// ============================================================================
// PROVIDERS
// ============================================================================

#[test]
fn test_any_iterable_collection_of_resource_ids() {
    fn compile_with(provider: impl cretoai_acl::ResourceProvider + 'static) -> PolicyCompiler {
        PolicyCompiler::builder("iterables")
            .resource_provider(provider)
            .build()
    }

    let compilers = vec![
        compile_with(FnProvider::new("vec", || vec!["docs", "images"])),
        compile_with(FnProvider::new("array", || ["docs", "images"])),
        compile_with(FnProvider::new("hash_set", || HashSet::from(["docs", "images"]))),
        compile_with(FnProvider::new("btree_set", || BTreeSet::from(["docs", "images"]))),
        compile_with(FnProvider::new("deque", || {
            VecDeque::from(vec!["docs".to_string(), "images".to_string()])
        })),
        compile_with(FnProvider::new("iterator", || {
            (0..2).map(|i| if i == 0 { "docs" } else { "images" })
        })),
    ];

    for compiler in compilers {
        let policy = compiler.compile().unwrap();
        assert!(policy.has_resource("docs"));
        assert!(policy.has_resource("images"));
        assert!(!policy.has_resource("videos"));
    }
}

#[test]
fn test_scalar_resource_output_is_rejected() {
    for document in [json!(42), json!("docs"), json!(true), json!(null)] {
        let compiler = PolicyCompiler::builder("scalar")
            .resource_provider(ConfigResourceProvider::new("scalar", document))
            .build();

        match compiler.compile() {
            Err(AclError::InvalidProviderOutput { provider, .. }) => assert_eq!(provider, "scalar"),
            other => panic!("expected InvalidProviderOutput, got {:?}", other),
        }
    }
}

#[test]
fn test_parent_role_from_another_provider() {
    let compiler = PolicyCompiler::builder("cross-provider")
        // The child is registered before the provider that defines its parent
        .role_provider(StaticProvider::new("staff", vec![RoleEntry::new("editor").with_parent("member")]))
        .role_provider(StaticProvider::new("base", vec![RoleEntry::new("member")]))
        .resource_provider(StaticProvider::new("resources", vec![ResourceEntry::new("wiki")]))
        .rule_provider(StaticProvider::new("rules", vec![Rule::allow("member", "wiki", "read")]))
        .build();

    let policy = compiler.compile().unwrap();
    let ctx = EvalContext::new();

    assert!(policy.inherits_role("editor", "member", true).unwrap());
    assert!(policy.is_allowed("editor", "wiki", "read", &ctx).unwrap());
}

#[test]
fn test_resource_parent_from_later_provider() {
    let compiler = PolicyCompiler::builder("deferred")
        .resource_provider(StaticProvider::new(
            "children",
            vec![ResourceEntry::new("docs.private").with_parent("docs")],
        ))
        .resource_provider(StaticProvider::new("roots", vec![ResourceEntry::new("docs")]))
        .build();

    let policy = compiler.compile().unwrap();
    assert!(policy.inherits_resource("docs.private", "docs", true).unwrap());
}

#[test]
fn test_rules_concatenate_in_provider_order() {
    let compiler = PolicyCompiler::builder("ordering")
        .role_provider(StaticProvider::new("roles", vec![RoleEntry::new("guest")]))
        .resource_provider(StaticProvider::new("resources", vec![ResourceEntry::new("docs")]))
        .rule_provider(StaticProvider::new("first", vec![Rule::deny("guest", "docs", "read")]))
        .rule_provider(StaticProvider::new("second", vec![Rule::allow("guest", "docs", "read")]))
        .build();

    let policy = compiler.compile().unwrap();
    let decision = policy.explain("guest", "docs", "read", &EvalContext::new()).unwrap();
    assert!(decision.allowed);
    assert_eq!(decision.rule, Some(1));
}

// ============================================================================
// BUILD ERRORS
// ============================================================================

fn compile(roles: Vec<RoleEntry>, resources: Vec<ResourceEntry>, rules: Vec<Rule>) -> AclError {
    PolicyCompiler::builder("errors")
        .role_provider(StaticProvider::new("roles", roles))
        .resource_provider(StaticProvider::new("resources", resources))
        .rule_provider(StaticProvider::new("rules", rules))
        .build()
        .compile()
        .unwrap_err()
}

#[test]
fn test_rule_with_unregistered_role() {
    let err = compile(
        vec![RoleEntry::new("guest")],
        vec![ResourceEntry::new("docs")],
        vec![
            Rule::allow("guest", "docs", "read"),
            Rule::allow(vec!["guest", "ghost"], "docs", "edit"),
        ],
    );

    match err {
        AclError::UnknownRuleReference { rule, kind, id } => {
            assert_eq!(rule, 1);
            assert_eq!(kind, "role");
            assert_eq!(id, "ghost");
        }
        other => panic!("expected UnknownRuleReference, got {:?}", other),
    }
}

#[test]
fn test_rule_with_unregistered_resource() {
    let err = compile(
        vec![RoleEntry::new("guest")],
        vec![ResourceEntry::new("docs")],
        vec![Rule::allow("guest", "videos", "read")],
    );
    assert!(matches!(err, AclError::UnknownRuleReference { kind: "resource", .. }));
}

#[test]
fn test_undeclared_privilege_when_vocabulary_exists() {
    let err = compile(
        vec![RoleEntry::new("guest")],
        vec![ResourceEntry::new("docs").with_privilege("read")],
        vec![Rule::allow("guest", "docs", "publish")],
    );
    assert!(matches!(err, AclError::UnknownRuleReference { kind: "privilege", .. }));
}

#[test]
fn test_unknown_parent_role() {
    let err = compile(vec![RoleEntry::new("user").with_parent("guest")], vec![], vec![]);
    assert!(matches!(
        err,
        AclError::UnknownRoleReference { ref role, ref parent } if role == "user" && parent == "guest"
    ));
}

#[test]
fn test_unknown_parent_resource() {
    let err = compile(vec![], vec![ResourceEntry::new("docs.private").with_parent("docs")], vec![]);
    assert!(matches!(err, AclError::UnknownResourceParent { .. }));
}

#[test]
fn test_role_cycle_is_reported() {
    let err = compile(
        vec![
            RoleEntry::new("a").with_parent("c"),
            RoleEntry::new("b").with_parent("a"),
            RoleEntry::new("c").with_parent("b"),
        ],
        vec![],
        vec![],
    );
    match err {
        AclError::CircularRoleInheritance(path) => {
            for role in ["a", "b", "c"] {
                assert!(path.contains(role), "cycle path '{}' misses {}", path, role);
            }
        }
        other => panic!("expected CircularRoleInheritance, got {:?}", other),
    }
}

#[test]
fn test_resource_cycle_is_reported() {
    let err = compile(
        vec![],
        vec![
            ResourceEntry::new("a").with_parent("b"),
            ResourceEntry::new("b").with_parent("a"),
        ],
        vec![],
    );
    assert!(matches!(err, AclError::CircularResourceHierarchy(_)));
}

#[test]
fn test_duplicates_across_providers() {
    let err = PolicyCompiler::builder("dupes")
        .role_provider(StaticProvider::new("one", vec![RoleEntry::new("guest")]))
        .role_provider(StaticProvider::new("two", vec![RoleEntry::new("guest")]))
        .build()
        .compile()
        .unwrap_err();
    assert!(matches!(err, AclError::DuplicateRole(ref id) if id == "guest"));

    let err = compile(vec![], vec![ResourceEntry::new("docs"), ResourceEntry::new("docs")], vec![]);
    assert!(matches!(err, AclError::DuplicateResource(_)));
}
