mod common;

use assert_matches::assert_matches;

use encode_matcher::domain::{Modality, ResolutionStrategy};
use encode_matcher::error::MatchError;
use encode_matcher::fetch::{catalog_filter, scorer_predicate};
use encode_matcher::filter;
use encode_matcher::matching::group_by_key;
use encode_matcher::model::{ExperimentRecord, FileWithExperiment};
use encode_matcher::resolve::{MatchResult, Resolver};
use encode_matcher::score::QualityScorer;

use common::{alignment, bed_methyl, experiment, peaks};

fn primaries(experiment: ExperimentRecord) -> Vec<FileWithExperiment> {
    FileWithExperiment::from_experiment(experiment, filter::is_replicated_peaks)
}

fn methyl_candidates(experiments: Vec<ExperimentRecord>) -> Vec<FileWithExperiment> {
    experiments
        .into_iter()
        .flat_map(|experiment| {
            FileWithExperiment::from_experiment(experiment, filter::is_bed_methyl)
        })
        .collect()
}

fn whole_experiment(
    primaries: &[FileWithExperiment],
    candidates: &[FileWithExperiment],
) -> Result<Vec<MatchResult>, MatchError> {
    let groups = group_by_key(candidates);
    Resolver::new(ResolutionStrategy::WholeExperiment, filter::is_alignment)
        .resolve(primaries, &groups)
}

#[test]
fn peak_file_resolves_to_best_methylation_experiment() {
    let primaries = FileWithExperiment::from_experiment(
        common::fixture("chip_seq_experiment.json"),
        catalog_filter(Modality::ChipSeq),
    );
    assert_eq!(primaries.len(), 1);

    let candidates: Vec<_> = [
        "wgbs_weaker_experiment.json",
        "wgbs_best_experiment.json",
        "wgbs_other_donor_experiment.json",
    ]
    .into_iter()
    .flat_map(|name| {
        FileWithExperiment::from_experiment(
            common::fixture(name),
            catalog_filter(Modality::Methylation),
        )
    })
    .collect();
    let groups = group_by_key(&candidates);
    assert_eq!(groups.len(), 2);

    let resolver = Resolver::new(
        ResolutionStrategy::WholeExperiment,
        scorer_predicate(Modality::Methylation),
    );
    let results = resolver.resolve(&primaries, &groups).unwrap();

    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert_eq!(result.primary.file_accession(), "ENCFF981HPG");
    assert_eq!(result.experiment.accession, "ENCSR765JPC");
    assert!(result.file_accessions().contains(&"ENCFF550FZT"));
    assert_eq!(result.file_accessions(), vec!["ENCFF550FZT", "ENCFF601MTH"]);
    assert_eq!(result.key.donor_id(), "/human-donors/ENCDO451RUA/");
    assert_eq!(result.key.assembly(), "GRCh38");
}

#[test]
fn single_experiment_contributes_its_whole_file_set_unscored() {
    let primaries = primaries(experiment("ENCSR001CHP", "d1", vec![peaks("ENCFF001PKS")]));
    let candidates = methyl_candidates(vec![experiment(
        "ENCSR001WGB",
        "d1",
        vec![bed_methyl("ENCFF001MTH", 1), bed_methyl("ENCFF002MTH", 2)],
    )]);
    let groups = group_by_key(&candidates);
    let resolver = Resolver::new(ResolutionStrategy::WholeExperiment, filter::is_alignment);
    let mut scorer = QualityScorer::new(filter::is_alignment);

    let results = resolver
        .resolve_with(&primaries, &groups, &mut scorer)
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].experiment.accession, "ENCSR001WGB");
    assert_eq!(
        results[0].file_accessions(),
        vec!["ENCFF001MTH", "ENCFF002MTH"]
    );
    assert_eq!(scorer.evaluations(), 0);
}

#[test]
fn highest_scoring_experiment_wins() {
    let primaries = primaries(experiment("ENCSR001CHP", "d1", vec![peaks("ENCFF001PKS")]));
    let candidates = methyl_candidates(vec![
        experiment(
            "ENCSR001WGB",
            "d1",
            vec![
                bed_methyl("ENCFF001MTH", 1),
                alignment("ENCFF001BAM", &[1], Some("80.0%")),
            ],
        ),
        experiment(
            "ENCSR002WGB",
            "d1",
            vec![
                bed_methyl("ENCFF002MTH", 1),
                alignment("ENCFF002BAM", &[1], Some("93.5%")),
            ],
        ),
    ]);

    let results = whole_experiment(&primaries, &candidates).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].experiment.accession, "ENCSR002WGB");
    assert_eq!(results[0].file_accessions(), vec!["ENCFF002MTH"]);
}

#[test]
fn first_experiment_wins_a_tie() {
    let primaries = primaries(experiment("ENCSR001CHP", "d1", vec![peaks("ENCFF001PKS")]));
    let candidates = methyl_candidates(vec![
        experiment(
            "ENCSR002WGB",
            "d1",
            vec![
                bed_methyl("ENCFF002MTH", 1),
                alignment("ENCFF002BAM", &[1], Some("88%")),
            ],
        ),
        experiment(
            "ENCSR001WGB",
            "d1",
            vec![
                bed_methyl("ENCFF001MTH", 1),
                alignment("ENCFF001BAM", &[1], Some("88%")),
            ],
        ),
    ]);

    let results = whole_experiment(&primaries, &candidates).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].experiment.accession, "ENCSR002WGB");
}

#[test]
fn unscoreable_experiment_is_never_chosen() {
    let primaries = primaries(experiment("ENCSR001CHP", "d1", vec![peaks("ENCFF001PKS")]));
    let candidates = methyl_candidates(vec![
        experiment("ENCSR001WGB", "d1", vec![bed_methyl("ENCFF001MTH", 1)]),
        experiment(
            "ENCSR002WGB",
            "d1",
            vec![
                bed_methyl("ENCFF002MTH", 1),
                alignment("ENCFF002BAM", &[1], Some("4.2%")),
            ],
        ),
    ]);

    let results = whole_experiment(&primaries, &candidates).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].experiment.accession, "ENCSR002WGB");
}

#[test]
fn zero_scoring_experiment_beats_unscoreable_one() {
    let primaries = primaries(experiment("ENCSR001CHP", "d1", vec![peaks("ENCFF001PKS")]));
    let candidates = methyl_candidates(vec![
        experiment("ENCSR001WGB", "d1", vec![bed_methyl("ENCFF001MTH", 1)]),
        experiment(
            "ENCSR002WGB",
            "d1",
            vec![
                bed_methyl("ENCFF002MTH", 1),
                alignment("ENCFF002BAM", &[1], None),
            ],
        ),
    ]);

    let results = whole_experiment(&primaries, &candidates).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].experiment.accession, "ENCSR002WGB");
    assert_eq!(results[0].file_accessions(), vec!["ENCFF002MTH"]);
}

#[test]
fn all_unscoreable_competitors_yield_no_match() {
    let primaries = primaries(experiment("ENCSR001CHP", "d1", vec![peaks("ENCFF001PKS")]));
    let candidates = methyl_candidates(vec![
        experiment("ENCSR001WGB", "d1", vec![bed_methyl("ENCFF001MTH", 1)]),
        experiment(
            "ENCSR002WGB",
            "d1",
            vec![
                bed_methyl("ENCFF002MTH", 1),
                alignment("ENCFF002BAM", &[1, 2], Some("99%")),
            ],
        ),
    ]);

    let results = whole_experiment(&primaries, &candidates).unwrap();
    assert!(results.is_empty());
}

#[test]
fn malformed_percentage_aborts_resolution() {
    let primaries = primaries(experiment("ENCSR001CHP", "d1", vec![peaks("ENCFF001PKS")]));
    let candidates = methyl_candidates(vec![
        experiment(
            "ENCSR001WGB",
            "d1",
            vec![
                bed_methyl("ENCFF001MTH", 1),
                alignment("ENCFF001BAM", &[1], Some("unknown")),
            ],
        ),
        experiment(
            "ENCSR002WGB",
            "d1",
            vec![
                bed_methyl("ENCFF002MTH", 1),
                alignment("ENCFF002BAM", &[1], Some("91%")),
            ],
        ),
    ]);

    let err = whole_experiment(&primaries, &candidates).unwrap_err();
    assert_matches!(err, MatchError::MalformedPercentage(value) if value == "unknown");
}

#[test]
fn duplicate_primaries_resolve_once() {
    let primary = primaries(experiment("ENCSR001CHP", "d1", vec![peaks("ENCFF001PKS")]));
    let duplicated = vec![primary[0].clone(), primary[0].clone()];
    let candidates = methyl_candidates(vec![experiment(
        "ENCSR001WGB",
        "d1",
        vec![bed_methyl("ENCFF001MTH", 1)],
    )]);

    let results = whole_experiment(&duplicated, &candidates).unwrap();
    assert_eq!(results.len(), 1);
}

#[test]
fn unkeyable_records_never_appear_in_results() {
    let mut unassembled = peaks("ENCFF002PKS");
    unassembled.assembly = None;
    let primaries = primaries(experiment(
        "ENCSR001CHP",
        "d1",
        vec![peaks("ENCFF001PKS"), unassembled],
    ));

    let mut orphan = experiment("ENCSR002WGB", "d1", vec![bed_methyl("ENCFF002MTH", 1)]);
    orphan.replicates.clear();
    let candidates = methyl_candidates(vec![
        orphan,
        experiment("ENCSR001WGB", "d1", vec![bed_methyl("ENCFF001MTH", 1)]),
    ]);

    let results = whole_experiment(&primaries, &candidates).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].primary.file_accession(), "ENCFF001PKS");
    assert_eq!(results[0].experiment.accession, "ENCSR001WGB");
}

#[test]
fn donors_do_not_cross_match() {
    let primaries = primaries(experiment("ENCSR001CHP", "d1", vec![peaks("ENCFF001PKS")]));
    let candidates = methyl_candidates(vec![experiment(
        "ENCSR001WGB",
        "d2",
        vec![bed_methyl("ENCFF001MTH", 1)],
    )]);

    let results = whole_experiment(&primaries, &candidates).unwrap();
    assert!(results.is_empty());
}

#[test]
fn scores_are_memoized_across_primaries() {
    let primaries = primaries(experiment(
        "ENCSR001CHP",
        "d1",
        vec![peaks("ENCFF001PKS"), peaks("ENCFF002PKS")],
    ));
    let candidates = methyl_candidates(vec![
        experiment(
            "ENCSR001WGB",
            "d1",
            vec![
                bed_methyl("ENCFF001MTH", 1),
                alignment("ENCFF001BAM", &[1], Some("70%")),
            ],
        ),
        experiment(
            "ENCSR002WGB",
            "d1",
            vec![
                bed_methyl("ENCFF002MTH", 1),
                alignment("ENCFF002BAM", &[1], Some("75%")),
            ],
        ),
    ]);
    let groups = group_by_key(&candidates);
    let resolver = Resolver::new(ResolutionStrategy::WholeExperiment, filter::is_alignment);
    let mut scorer = QualityScorer::new(filter::is_alignment);

    let results = resolver
        .resolve_with(&primaries, &groups, &mut scorer)
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(
        results
            .iter()
            .all(|result| result.experiment.accession == "ENCSR002WGB")
    );
    assert_eq!(scorer.evaluations(), 2);
}

#[test]
fn per_file_pairs_every_candidate_once() {
    let primary = primaries(experiment("ENCSR001CHP", "d1", vec![peaks("ENCFF001PKS")]));
    let duplicated = vec![primary[0].clone(), primary[0].clone()];
    let candidates: Vec<_> = [
        experiment(
            "ENCSR001DNS",
            "d1",
            vec![alignment("ENCFF001BAM", &[1], Some("not a number"))],
        ),
        experiment(
            "ENCSR002DNS",
            "d1",
            vec![alignment("ENCFF002BAM", &[1], None)],
        ),
    ]
    .into_iter()
    .flat_map(|experiment| FileWithExperiment::from_experiment(experiment, filter::is_bam))
    .collect();
    let groups = group_by_key(&candidates);

    let results = Resolver::new(ResolutionStrategy::PerFile, filter::is_bam)
        .resolve(&duplicated, &groups)
        .unwrap();

    let pairs: Vec<_> = results
        .iter()
        .map(|result| (result.experiment.accession.as_str(), result.file_accessions()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("ENCSR001DNS", vec!["ENCFF001BAM"]),
            ("ENCSR002DNS", vec!["ENCFF002BAM"]),
        ]
    );
}
