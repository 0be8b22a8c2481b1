//! Enrichment: generate a pedagogical explanation per pending question.
//!
//! Takes the per-year lock, then walks pending questions cache-first. The
//! dataset is saved atomically after every enriched question, so a
//! rate-limited batch interrupted halfway keeps everything done so far.

use log::{info, warn};
use serde_json::json;

use crate::cache::ContentCache;
use crate::client::{TextModel, parse_explanation};
use crate::dataset::{self, Question};
use crate::error::Result;
use crate::layout::DataLayout;
use crate::lock::YearLock;

const ENRICH_PROMPT_HEADER: &str = "\
Voce e um professor especialista em vestibular (nivel Fuvest).
Dado o JSON de uma questao de multipla escolha (A-E) e a alternativa correta,
gere uma explicacao extremamente didatica, tecnica e precisa.
Regras obrigatorias:
1) Nao altere enunciado e alternativas.
2) Sempre gere: theory, steps, distractors, finalSummary.
3) Distractors: explique por que CADA alternativa errada esta errada (A,B,C,D,E).
4) Nao invente dados. Se faltar informacao no enunciado, deixe claro.
5) Output deve ser SOMENTE JSON estrito e valido com o schema:
{\"theory\": string, \"steps\": [string], \"distractors\": {\"A\": string, \"B\": string, \"C\": string, \"D\": string, \"E\": string}, \"finalSummary\": string}
";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnrichOptions {
    /// Stop after this many pending questions; 0 means no limit.
    pub limit: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnrichSummary {
    pub attempted: usize,
    pub enriched: usize,
}

fn build_prompt(question: &Question) -> Result<String> {
    let payload = json!({
        "id": question.id,
        "number": question.number,
        "stem": question.stem,
        "options": question.options,
        "answer": question.answer,
    });
    Ok(format!(
        "{ENRICH_PROMPT_HEADER}\nDados da questao:\n{}\nResposta correta: {}",
        serde_json::to_string_pretty(&payload)?,
        question.answer.correct
    ))
}

pub fn enrich_year(
    model: &dyn TextModel,
    layout: &DataLayout,
    year: u16,
    options: &EnrichOptions,
) -> Result<EnrichSummary> {
    let _lock = YearLock::acquire(&layout.lock_path(year))?;

    let dataset_path = layout.dataset_path(year);
    let mut dataset = dataset::load(&dataset_path)?;
    let cache = ContentCache::new(layout.cache_dir(year, "enrichment"));

    let mut summary = EnrichSummary::default();
    for i in 0..dataset.questions.len() {
        if !dataset.questions[i].explanation.is_pending() {
            continue;
        }
        if options.limit > 0 && summary.attempted >= options.limit {
            info!("limit of {} questions reached", options.limit);
            break;
        }
        summary.attempted += 1;

        let question = &dataset.questions[i];
        let key = ContentCache::key_for(question.content_hash().as_bytes());
        let value = match cache.get::<serde_json::Value>(&key)? {
            Some(hit) => {
                info!("{}: cache hit", question.id);
                hit
            }
            None => {
                info!("{}: calling model", question.id);
                match model.generate_json(&build_prompt(question)?) {
                    Ok(response) => {
                        cache.put(&key, &response)?;
                        response
                    }
                    Err(e) => {
                        warn!("{}: enrichment failed: {e}", question.id);
                        continue;
                    }
                }
            }
        };

        let Some(explanation) = parse_explanation(&value) else {
            warn!("{}: response missing theory, skipped", dataset.questions[i].id);
            continue;
        };
        dataset.questions[i].explanation = explanation;
        summary.enriched += 1;
        // Checkpoint after every question; interruption loses nothing.
        dataset::save(&dataset, &dataset_path)?;
    }

    info!(
        "{year}: enriched {}/{} attempted",
        summary.enriched, summary.attempted
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{
        Answer, Assets, Dataset, Explanation, OptionEntry, Source,
    };
    use crate::error::PipelineError;
    use provex_core::{OPTION_KEYS, PixelBox};
    use serde_json::Value;
    use std::cell::RefCell;

    struct ScriptedModel {
        responses: RefCell<Vec<Value>>,
        calls: RefCell<usize>,
    }

    impl TextModel for ScriptedModel {
        fn generate_json(&self, _prompt: &str) -> Result<Value> {
            *self.calls.borrow_mut() += 1;
            let mut responses = self.responses.borrow_mut();
            if responses.is_empty() {
                return Err(PipelineError::Api("exhausted".into()));
            }
            Ok(responses.remove(0))
        }
    }

    fn question(year: u16, number: u8, pending: bool) -> Question {
        Question {
            id: Question::make_id(year, number),
            year,
            number,
            page: 2,
            bbox: PixelBox {
                x: 0,
                y: 100,
                w: 800,
                h: 600,
            },
            stem: format!("Enunciado da questão {number}."),
            options: OPTION_KEYS
                .iter()
                .map(|&key| OptionEntry {
                    key,
                    text: format!("alternativa {key}"),
                })
                .collect(),
            answer: Answer { correct: 'B' },
            explanation: if pending {
                Explanation::pending()
            } else {
                Explanation {
                    theory: "Já explicada.".to_string(),
                    steps: Vec::new(),
                    distractors: Default::default(),
                    final_summary: String::new(),
                }
            },
            assets: Assets {
                question_image: format!("/assets/{year}/q{number:02}/image.png"),
            },
        }
    }

    fn write_dataset(layout: &DataLayout, questions: Vec<Question>) {
        let dataset = Dataset {
            year: 2020,
            source: Source {
                prova_pdf: "provas/p20.pdf".to_string(),
                gabarito_pdf: "provas/g20.pdf".to_string(),
            },
            generated_at: "2026-01-10T12:00:00Z".to_string(),
            questions,
        };
        dataset::save(&dataset, &layout.dataset_path(2020)).unwrap();
    }

    fn explanation_json() -> Value {
        serde_json::json!({
            "theory": "Conceito central.",
            "steps": ["Leia o enunciado.", "Elimine as absurdas."],
            "distractors": {"A": "erro A", "C": "erro C", "D": "erro D", "E": "erro E"},
            "finalSummary": "Resumo."
        })
    }

    #[test]
    fn enriches_only_pending_questions() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        write_dataset(
            &layout,
            vec![question(2020, 1, false), question(2020, 2, true)],
        );
        let model = ScriptedModel {
            responses: RefCell::new(vec![explanation_json()]),
            calls: RefCell::new(0),
        };

        let summary = enrich_year(&model, &layout, 2020, &EnrichOptions::default()).unwrap();
        assert_eq!(summary.attempted, 1);
        assert_eq!(summary.enriched, 1);
        assert_eq!(*model.calls.borrow(), 1);

        let saved = dataset::load(&layout.dataset_path(2020)).unwrap();
        assert_eq!(saved.questions[0].explanation.theory, "Já explicada.");
        assert_eq!(saved.questions[1].explanation.theory, "Conceito central.");
    }

    #[test]
    fn limit_caps_attempted_questions() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        write_dataset(
            &layout,
            vec![
                question(2020, 1, true),
                question(2020, 2, true),
                question(2020, 3, true),
            ],
        );
        let model = ScriptedModel {
            responses: RefCell::new(vec![explanation_json(), explanation_json()]),
            calls: RefCell::new(0),
        };

        let summary = enrich_year(&model, &layout, 2020, &EnrichOptions { limit: 2 }).unwrap();
        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.enriched, 2);

        let saved = dataset::load(&layout.dataset_path(2020)).unwrap();
        assert!(saved.questions[2].explanation.is_pending());
    }

    #[test]
    fn failed_call_skips_question_but_continues() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        write_dataset(
            &layout,
            vec![question(2020, 1, true), question(2020, 2, true)],
        );
        // First response consumed by q1; q2 then errors out.
        let model = ScriptedModel {
            responses: RefCell::new(vec![explanation_json()]),
            calls: RefCell::new(0),
        };

        let summary = enrich_year(&model, &layout, 2020, &EnrichOptions::default()).unwrap();
        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.enriched, 1);
        let saved = dataset::load(&layout.dataset_path(2020)).unwrap();
        assert!(saved.questions[1].explanation.is_pending());
    }

    #[test]
    fn second_run_replays_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        write_dataset(&layout, vec![question(2020, 1, true)]);
        let model = ScriptedModel {
            responses: RefCell::new(vec![explanation_json()]),
            calls: RefCell::new(0),
        };
        enrich_year(&model, &layout, 2020, &EnrichOptions::default()).unwrap();

        // Reset to pending; re-running must hit the cache, not the model.
        write_dataset(&layout, vec![question(2020, 1, true)]);
        let summary = enrich_year(&model, &layout, 2020, &EnrichOptions::default()).unwrap();
        assert_eq!(summary.enriched, 1);
        assert_eq!(*model.calls.borrow(), 1);
    }

    #[test]
    fn held_lock_blocks_enrichment_and_leaves_dataset_alone() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        write_dataset(&layout, vec![question(2020, 1, true)]);
        let _held = YearLock::acquire(&layout.lock_path(2020)).unwrap();

        let model = ScriptedModel {
            responses: RefCell::new(vec![explanation_json()]),
            calls: RefCell::new(0),
        };
        let result = enrich_year(&model, &layout, 2020, &EnrichOptions::default());
        assert!(matches!(result, Err(PipelineError::LockHeld { .. })));
        assert_eq!(*model.calls.borrow(), 0);
        let saved = dataset::load(&layout.dataset_path(2020)).unwrap();
        assert!(saved.questions[0].explanation.is_pending());
    }
}
