//! Provider selection tests

mod common;

use common::stack;
use deployify::deploy::registry::{
    ProviderRegistry, AWS_AMPLIFY, DIGITALOCEAN, LOCAL, NETLIFY, VERCEL,
};
use deployify::deploy::selector::ProviderSelector;
use deployify::errors::DeployError;
use deployify::models::deployment::{Budget, Environment};
use deployify::models::provider::{ArchitectureType, CostTier, ProviderConfig};
use deployify::models::stack::ProjectType;

fn selector() -> ProviderSelector {
    ProviderSelector::new(ProviderRegistry::builtin())
}

fn prefer(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[test]
fn test_free_spa_goes_local() {
    let chosen = selector()
        .select(&stack(ProjectType::Spa, "React"), Environment::School, Budget::Free, &[])
        .unwrap();
    assert_eq!(chosen, LOCAL);
}

#[test]
fn test_dockerfile_overrides_type_table() {
    let mut s = stack(ProjectType::Api, "Express.js");
    s.has_dockerfile = true;
    let chosen = selector()
        .select(&s, Environment::Prod, Budget::Any, &[])
        .unwrap();
    assert_eq!(chosen, DIGITALOCEAN);
}

#[test]
fn test_next_routes_to_vercel() {
    let chosen = selector()
        .select(&stack(ProjectType::Ssr, "Next.js"), Environment::School, Budget::Free, &[])
        .unwrap();
    assert_eq!(chosen, VERCEL);
}

#[test]
fn test_gatsby_routes_to_netlify() {
    let chosen = selector()
        .select(&stack(ProjectType::Static, "Gatsby"), Environment::Staging, Budget::Free, &[])
        .unwrap();
    assert_eq!(chosen, NETLIFY);
}

#[test]
fn test_preference_wins_when_eligible() {
    let chosen = selector()
        .select(
            &stack(ProjectType::Spa, "React"),
            Environment::Prod,
            Budget::Low,
            &prefer(&[AWS_AMPLIFY, NETLIFY]),
        )
        .unwrap();
    assert_eq!(chosen, AWS_AMPLIFY);
}

#[test]
fn test_ineligible_preference_is_skipped() {
    // amplify is paid, so a free budget drops it and the next preference applies
    let chosen = selector()
        .select(
            &stack(ProjectType::Spa, "React"),
            Environment::Prod,
            Budget::Free,
            &prefer(&[AWS_AMPLIFY, NETLIFY]),
        )
        .unwrap();
    assert_eq!(chosen, NETLIFY);

    let chosen = selector()
        .select(
            &stack(ProjectType::Spa, "React"),
            Environment::Prod,
            Budget::Free,
            &prefer(&[DIGITALOCEAN]),
        )
        .unwrap();
    assert_eq!(chosen, LOCAL);
}

#[test]
fn test_free_budget_never_returns_paid_provider() {
    let result = selector().select(
        &stack(ProjectType::Api, "Django"),
        Environment::Prod,
        Budget::Free,
        &[],
    );
    match result {
        Err(DeployError::NoEligibleProvider { project_type, .. }) => {
            assert_eq!(project_type, "api");
        }
        Ok(id) => {
            let registry = ProviderRegistry::builtin();
            assert_eq!(registry.get(&id).unwrap().cost_tier, CostTier::Free);
        }
        Err(other) => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_school_excludes_paid_environments() {
    let selector = selector();
    let eligible = selector.eligible(
        &stack(ProjectType::Container, "Docker"),
        Environment::School,
        Budget::Any,
    );
    assert!(eligible.iter().all(|p| p.id != DIGITALOCEAN));
}

#[test]
fn test_selection_is_pure() {
    let selector = selector();
    let s = stack(ProjectType::Spa, "Vue (Vite)");
    let first = selector.select(&s, Environment::Staging, Budget::Any, &[]);
    let second = selector.select(&s, Environment::Staging, Budget::Any, &[]);
    assert_eq!(first.unwrap(), second.unwrap());
}

#[test]
fn test_first_eligible_when_table_has_no_match() {
    let registry = ProviderRegistry::new(vec![ProviderConfig {
        id: "pages".to_string(),
        name: "Pages".to_string(),
        architecture: ArchitectureType::Static,
        cost_tier: CostTier::Free,
        supports_environments: vec![Environment::School],
        max_build_time: 10,
        frameworks: vec!["static".to_string()],
    }]);
    let chosen = ProviderSelector::new(registry)
        .select(&stack(ProjectType::Static, "Eleventy"), Environment::School, Budget::Free, &[])
        .unwrap();
    assert_eq!(chosen, "pages");
}
