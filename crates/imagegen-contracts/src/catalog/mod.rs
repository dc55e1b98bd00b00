mod profiles;
mod registry;

pub use profiles::{ChainPlan, ChainPlanner, ChainProfile, PlaceholderStyle};
pub use registry::{
    BackendCatalog, BackendSpec, Capability, DALL_E_3, GEMINI_COLOR_HINT, GEMINI_FLASH_IMAGE,
    IMAGEGENERATION_005, IMAGEGENERATION_006, IMAGEN_3, IMAGEN_4_FAST, IMAGEN_4_PREDICT,
    PROVIDER_OPENAI, PROVIDER_VERTEX, PROVIDER_VERTEX_PREDICT,
};

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::{
        BackendCatalog, BackendSpec, Capability, ChainPlanner, ChainProfile, PlaceholderStyle,
        DALL_E_3, GEMINI_COLOR_HINT, GEMINI_FLASH_IMAGE, IMAGEN_4_PREDICT,
    };

    fn names(specs: &[BackendSpec]) -> Vec<&str> {
        specs.iter().map(|spec| spec.name.as_str()).collect()
    }

    #[test]
    fn full_profile_keeps_catalog_priority_order() {
        let plan = ChainPlanner::new(None).plan(ChainProfile::Full);
        assert_eq!(
            names(&plan.backends),
            vec![
                "gemini-2.5-flash-image-preview",
                "imagen-3.0-generate-002",
                "imagen-4.0-fast-generate-001",
                "imagegeneration@006",
                "imagegeneration@005",
                "imagen-4.0-generate-001",
                "dall-e-3",
            ]
        );
        assert_eq!(plan.placeholder, PlaceholderStyle::Styled);
        assert!(plan.color_hint.is_none());
        assert!(plan.missing.is_empty());
    }

    #[test]
    fn genai_profile_uses_gradient_with_color_hint() {
        let plan = ChainPlanner::new(None).plan(ChainProfile::Genai);
        assert_eq!(plan.backends.len(), 4);
        assert!(plan
            .backends
            .iter()
            .all(|spec| spec.supports(Capability::MultimodalImage)));
        assert_eq!(plan.placeholder, PlaceholderStyle::Gradient);
        assert_eq!(
            plan.color_hint.map(|spec| spec.name),
            Some(GEMINI_COLOR_HINT.to_string())
        );
    }

    #[test]
    fn single_backend_profiles() {
        let planner = ChainPlanner::new(None);
        assert_eq!(
            names(&planner.plan(ChainProfile::Gemini).backends),
            vec![GEMINI_FLASH_IMAGE]
        );
        assert_eq!(
            names(&planner.plan(ChainProfile::Imagen).backends),
            vec![IMAGEN_4_PREDICT]
        );
        assert_eq!(
            names(&planner.plan(ChainProfile::Dalle).backends),
            vec![DALL_E_3]
        );
    }

    #[test]
    fn plan_reports_profile_entries_missing_from_catalog() {
        let mut backends = IndexMap::new();
        backends.insert(
            "custom".to_string(),
            BackendSpec {
                name: "custom".to_string(),
                provider: "vertex".to_string(),
                capabilities: vec![Capability::MultimodalImage],
                credential_env: Vec::new(),
            },
        );
        let plan = ChainPlanner::new(Some(BackendCatalog::new(Some(backends))))
            .plan(ChainProfile::Dalle);
        assert!(plan.backends.is_empty());
        assert_eq!(plan.missing, vec!["dall-e-3".to_string()]);
    }

    #[test]
    fn color_hint_backend_never_joins_image_chain() {
        let catalog = BackendCatalog::default();
        assert!(catalog
            .image_backends()
            .iter()
            .all(|spec| spec.name != GEMINI_COLOR_HINT));
        assert_eq!(catalog.by_capability(Capability::ColorHint).len(), 1);
    }

    #[test]
    fn profile_names_parse_case_insensitively() {
        assert_eq!("GenAI".parse::<ChainProfile>(), Ok(ChainProfile::Genai));
        assert_eq!(" dalle ".parse::<ChainProfile>(), Ok(ChainProfile::Dalle));
        let err = "midjourney".parse::<ChainProfile>().unwrap_err();
        assert!(err.starts_with("Unknown profile 'midjourney'"));
        assert_eq!(ChainProfile::default().to_string(), "full");
    }
}
