use proptest::prelude::*;
use rotalyze_types::{AnnotationSeverity, Annotations, CastVerdict, EventMeta};

fn severity() -> impl Strategy<Value = AnnotationSeverity> {
    prop_oneof![
        Just(AnnotationSeverity::Minor),
        Just(AnnotationSeverity::Moderate),
        Just(AnnotationSeverity::Major),
    ]
}

fn meta() -> impl Strategy<Value = EventMeta> {
    (severity(), any::<bool>(), "[a-z]{1,8}").prop_map(|(severity, enhanced, reason)| {
        if enhanced {
            EventMeta::enhanced(severity, reason)
        } else {
            EventMeta::inefficient(severity, reason)
        }
    })
}

proptest! {
    #[test]
    fn merged_severity_is_running_maximum(metas in prop::collection::vec(meta(), 1..20)) {
        let mut annotations = Annotations::new();
        let mut highest = metas[0].severity;

        for m in &metas {
            highest = highest.max(m.severity);
            annotations.annotate(0, m.clone());
            prop_assert_eq!(annotations.get(0).map(|a| a.severity), Some(highest));
        }
    }

    #[test]
    fn verdict_only_flips_on_strictly_higher_severity(first in meta(), second in meta()) {
        let mut current = first.clone();
        current.merge(second.clone());

        if current.verdict != first.verdict {
            prop_assert!(second.severity > first.severity);
            prop_assert_eq!(current.verdict, second.verdict);
        }
        prop_assert!(matches!(current.verdict, CastVerdict::Inefficient | CastVerdict::Enhanced));
    }
}
