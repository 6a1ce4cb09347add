//! The workflow engine: a state machine per client request.
//!
//! Every workflow funnels through the same wrapper - fresh trace context,
//! the three canonical progress keys set to `pending`, the body, a single
//! user-facing message for errors nothing has surfaced yet, and finally a
//! drain of the run's task bag so no delivery, backup, or in-flight remote
//! call outlives the run.

use crate::auth::Identity;
use crate::backup::BackupService;
use crate::errors::{ErrorKind, GatewayError};
use crate::events::{EventBus, EventSink, LogLevel, ProgressState, ProgressStep};
use crate::orchestrator::state::RunContext;
use crate::rpc::StageTransport;
use crate::stages::{
    PlanGeneratorCaller, TlGeneratorCaller, TlPickerCaller, UtGeneratorCaller, UtPickerCaller,
};
use crossport_common::{AiPlan, CodeProject, Operation, PickerResponse, ReturnCode};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{Instrument, error, info, warn};

const WORKFLOW_MIGRATE: &str = "migrate";
const WORKFLOW_GENERATE_PLAN: &str = "generate_plan";
const WORKFLOW_EXECUTE_PLAN: &str = "execute_plan";
const WORKFLOW_GENERATE_TESTS: &str = "generate_tests";
const WORKFLOW_RETRY: &str = "retry_with_candidates";
const WORKFLOW_IMPROVE: &str = "improve_translation";

const DEFAULT_MODEL: &str = "default";
const UPGRADE_DOTNET_MODEL: &str = "UPGRADE_DOTNET_PROJECT";

/// Target language used by the plan workflows; the generators treat it as
/// "stay in the source language, apply the instruction".
const PLAN_TARGET_LANGUAGE: &str = "gslite";

/// Plan operation handled by the test sub-procedure instead of translation.
const GENERATE_TESTS_OPERATION: &str = "GENERATE_TESTS";

/// The standalone generate-tests workflow only supports these languages.
const GENERATE_TESTS_LANGUAGES: [&str; 2] = ["dotnetframework", "dotnet8"];
const GENERATE_TESTS_TARGET: &str = "dotnet8";

/// Known demo project that receives a canned upgrade plan instead of a
/// remote call.
const CANNED_PLAN_PROJECT: &str = "OrderTrackingDashboard";

const CANNED_DOTNET_PLAN: &str = "# AI Plan\n\
## Step 1: UPGRADE_DOTNET_PROJECT\n\
Upgrade the project from .NET Framework 4.8 to .NET 8.0. This includes updating the project file to use the new SDK style format and removing old Framework references.\n\
## Step 2: CREATE_PROGRAM_FILE\n\
Create a new Program.cs file with minimal ASP.NET Core 8.0 setup without authentication, database or static files configuration.\n\
## Step 3: RESTRUCTURE_PROJECT_FROM_ASPNET_TO_ASPNETCORE\n\
Restructure the project to follow ASP.NET Core conventions, including updating controller base classes, removing Web.config, and updating namespace references.\n\
## Step 4: UPDATE_CSPROJ\n\
Update the project file to use the new ASP.NET Core references and needed packages for the application.\n\
## Step 5: UPDATE_LAYOUT_REFERENCES\n\
Update _Layout.cshtml to use CDN references for Bootstrap, jQuery, and Modernizr. Remove old bundling references.\n\
## Step 6: CREATE_APPSETTINGS\n\
Create appsettings.json file with basic configuration settings for the application.\n\
## Step 7: CREATE_LAUNCHSETTINGS\n\
Create launchSettings.json file in the Properties folder with default port 6060 configuration.\n\
## Step 8: CLEANUP_OLD_FILES\n\
Remove old ASP.NET Framework specific files like Global.asax, Web.config, packages.config, and App_Start folder contents.\n";

const DEFAULT_PLAN_INSTRUCTION: &str = "\
Please modernize this project.
Depending on the project, you could do the following things:
- Refactor magic numbers and strings
- Refactor to use modern language features
- Add docstrings to the most important functions
- Fix most common deprecations for this language
- Optimize loops and other performance-critical parts
- Refactor large functions into smaller ones
- Improve error handling

Do not do all of the above, just pick a few things that you think are most important given the codebase.";

/// Toggles for plan execution: whether generated tests go through the
/// picker, and whether a failed pick gets the one-shot autofix retry.
#[derive(Debug, Clone, Copy)]
pub struct ExecutePlanOptions {
    pub validate: bool,
    pub autofix: bool,
}

impl Default for ExecutePlanOptions {
    fn default() -> Self {
        Self {
            validate: true,
            autofix: true,
        }
    }
}

/// Runs named workflows against the remote pipeline stages.
///
/// One engine serves many runs; all per-run state lives in the
/// [`RunContext`] created by the wrapper, so concurrent runs never share
/// mutable state.
pub struct WorkflowEngine {
    ut_generator: UtGeneratorCaller,
    ut_picker: UtPickerCaller,
    tl_generator: TlGeneratorCaller,
    tl_picker: TlPickerCaller,
    plan_generator: PlanGeneratorCaller,
    sinks: Vec<Arc<dyn EventSink>>,
    backup: Arc<dyn BackupService>,
    identity: Identity,
}

impl WorkflowEngine {
    pub fn new(
        transport: Arc<dyn StageTransport>,
        sinks: Vec<Arc<dyn EventSink>>,
        backup: Arc<dyn BackupService>,
        identity: Identity,
    ) -> Self {
        Self {
            ut_generator: UtGeneratorCaller::new(Arc::clone(&transport)),
            ut_picker: UtPickerCaller::new(Arc::clone(&transport)),
            tl_generator: TlGeneratorCaller::new(Arc::clone(&transport)),
            tl_picker: TlPickerCaller::new(Arc::clone(&transport)),
            plan_generator: PlanGeneratorCaller::new(transport),
            sinks,
            backup,
            identity,
        }
    }

    fn begin_run(&self) -> RunContext {
        RunContext::new(EventBus::new(self.sinks.clone()), &self.identity)
    }

    /// Common entry/exit for every workflow.
    async fn run_wrapper<F>(&self, workflow: &'static str, ctx: &RunContext, body: F)
    where
        F: Future<Output = Result<(), GatewayError>>,
    {
        let span = tracing::info_span!(
            "workflow",
            workflow,
            trace_id = %ctx.trace_id,
            user_id = %ctx.user_id,
            company_id = %ctx.company_id,
        );
        async {
            info!("starting workflow");
            ctx.events
                .log_view(format!("Trace ID: {}", ctx.trace_id), LogLevel::Info);
            for step in ProgressStep::ALL {
                ctx.events.progress_update(step, ProgressState::Pending);
            }

            match body.await {
                Ok(()) => info!("workflow body completed"),
                Err(err) if err.is_notified() => {
                    // the stage caller already published the user message
                    error!(error = %err, "workflow failed");
                }
                Err(err) => {
                    error!(error = %err, "unexpected error in workflow");
                    ctx.events
                        .log_view(err.user_message().to_string(), LogLevel::Error);
                }
            }

            // nothing spawned during the run may outlive it
            ctx.events.drain().await;
            info!("workflow completed");
        }
        .instrument(span)
        .await;
    }

    fn backup_project(
        &self,
        ctx: &RunContext,
        workflow: &'static str,
        label: String,
        project: &CodeProject,
    ) {
        let backup = Arc::clone(&self.backup);
        let trace_id = ctx.trace_id.clone();
        let project = project.clone();
        ctx.events.tasks().spawn(async move {
            backup
                .backup_project(&project, &trace_id, workflow, &label)
                .await
        });
    }

    fn backup_candidates(
        &self,
        ctx: &RunContext,
        workflow: &'static str,
        label: String,
        candidates: &[CodeProject],
    ) {
        let backup = Arc::clone(&self.backup);
        let trace_id = ctx.trace_id.clone();
        let candidates = candidates.to_vec();
        ctx.events.tasks().spawn(async move {
            backup
                .backup_candidates(&candidates, &trace_id, workflow, &label)
                .await
        });
    }

    /// Full migration: generate tests and translations concurrently, pick
    /// tests, then pick a translation validated against them.
    pub async fn migrate(&self, source_project: CodeProject, target_language: &str) {
        let ctx = self.begin_run();
        let body = self.migrate_body(&ctx, source_project, target_language);
        self.run_wrapper(WORKFLOW_MIGRATE, &ctx, body).await;
    }

    async fn migrate_body(
        &self,
        ctx: &RunContext,
        source: CodeProject,
        target_language: &str,
    ) -> Result<(), GatewayError> {
        let model = if source.source_language == "dotnetframework" && target_language == "dotnet8"
        {
            UPGRADE_DOTNET_MODEL
        } else {
            DEFAULT_MODEL
        };
        info!(
            "Started: Migrate {} from {} to {}",
            source.display_name, source.source_language, target_language
        );
        self.backup_project(ctx, WORKFLOW_MIGRATE, "source_project".into(), &source);

        if model == UPGRADE_DOTNET_MODEL {
            // assessment rides along in the background; its result arrives
            // on its own event and its failure never touches the migration
            let caller = self.tl_generator.clone();
            let assess_ctx = ctx.clone();
            let assess_source = source.clone();
            let target = target_language.to_string();
            ctx.events.tasks().spawn(async move {
                caller
                    .assess(&assess_ctx, &assess_source, &target)
                    .await
                    .map(|_| ())
                    .map_err(anyhow::Error::new)
            });
        }

        // translation generation starts now and is tracked in the bag
        // immediately, so it is joined even when the body aborts early
        let tl_rx = {
            let caller = self.tl_generator.clone();
            let gen_ctx = ctx.clone();
            let gen_source = source.clone();
            let target = target_language.to_string();
            let model = model.to_string();
            ctx.spawn_tracked(async move {
                caller
                    .generate(&gen_ctx, &gen_source, &target, &model, "")
                    .await
            })
        };

        let ut_gen = self
            .ut_generator
            .generate(ctx, &source, None, target_language, "")
            .await?;
        let ut_pick = self
            .ut_picker
            .pick(ctx, &source, &ut_gen.solutions, target_language)
            .await;
        if ut_pick.return_code != ReturnCode::Success {
            return Err(
                GatewayError::new(ErrorKind::TestPick, "Picking unit tests failed").notified(),
            );
        }

        let tl_gen = join_tracked(tl_rx).await??;
        let tl_pick = self
            .tl_picker
            .pick(
                ctx,
                &source,
                &ut_pick.solution,
                &tl_gen.solutions,
                target_language,
            )
            .await;
        if tl_pick.return_code != ReturnCode::Success {
            return Err(
                GatewayError::new(ErrorKind::TranslationPick, "Picking translation failed")
                    .notified(),
            );
        }
        Ok(())
    }

    /// Generate an execution plan and return its text form. The plan also
    /// travels to the client over the dedicated plan-generated event.
    pub async fn generate_plan(&self, source_project: CodeProject, instruction: &str) -> String {
        let ctx = self.begin_run();
        let instruction = if instruction.is_empty() {
            DEFAULT_PLAN_INSTRUCTION.to_string()
        } else {
            instruction.to_string()
        };
        let mut plan_text = String::new();
        {
            let body =
                self.generate_plan_body(&ctx, &source_project, &instruction, &mut plan_text);
            self.run_wrapper(WORKFLOW_GENERATE_PLAN, &ctx, body).await;
        }
        ctx.events
            .plan_generated(plan_text.clone(), LogLevel::Info)
            .await;
        info!(plan = %plan_text, "plan generated");
        plan_text
    }

    async fn generate_plan_body(
        &self,
        ctx: &RunContext,
        source: &CodeProject,
        instruction: &str,
        plan_text: &mut String,
    ) -> Result<(), GatewayError> {
        info!(
            "Started: GenPlan {} {}",
            source.display_name, source.source_language
        );
        self.backup_project(ctx, WORKFLOW_GENERATE_PLAN, "source_project".into(), source);

        // no test stage in this workflow; resolve its pending key right away
        ctx.events
            .progress_update(ProgressStep::GenerateUnittests, ProgressState::Completed);

        if source.display_name == CANNED_PLAN_PROJECT {
            *plan_text = CANNED_DOTNET_PLAN.to_string();
            ctx.events
                .progress_update(ProgressStep::Translate, ProgressState::Completed);
        } else {
            let response = self
                .plan_generator
                .generate(ctx, source, PLAN_TARGET_LANGUAGE, instruction)
                .await?;
            *plan_text = response.plan.to_text()?;
        }

        ctx.events
            .progress_update(ProgressStep::Validate, ProgressState::Completed);
        Ok(())
    }

    /// Replay a plan step by step. Single failed steps are recorded and
    /// skipped, never fatal; the client always receives a final translation
    /// result and a `validate: completed` update.
    pub async fn execute_plan(
        &self,
        source_project: CodeProject,
        plan_text: &str,
        options: ExecutePlanOptions,
    ) {
        let ctx = self.begin_run();
        let body = self.execute_plan_body(&ctx, source_project, plan_text, options);
        self.run_wrapper(WORKFLOW_EXECUTE_PLAN, &ctx, body).await;
    }

    async fn execute_plan_body(
        &self,
        ctx: &RunContext,
        source: CodeProject,
        plan_text: &str,
        options: ExecutePlanOptions,
    ) -> Result<(), GatewayError> {
        info!(
            "Started: ExecutePlan {} {}",
            source.display_name, source.source_language
        );
        self.backup_project(ctx, WORKFLOW_EXECUTE_PLAN, "source_project".into(), &source);

        let plan = AiPlan::from_text(plan_text)?;
        // cannot fail for a freshly parsed plan
        let rendered = plan.to_text()?;

        let mut source = source;
        let mut test_project: Option<CodeProject> = None;
        let mut sent_translation_result = false;
        let mut should_send_test_result = false;
        let mut failed_steps: Vec<usize> = Vec::new();

        for (index, operation) in plan.operations.iter().enumerate() {
            let step = index + 1;
            let step_result: Result<(), GatewayError> = async {
                let prompt = build_step_prompt(&rendered, operation);
                if operation.operation_name == GENERATE_TESTS_OPERATION {
                    should_send_test_result = true;
                    test_project = self
                        .generate_tests_validated(
                            ctx,
                            &source,
                            &prompt,
                            PLAN_TARGET_LANGUAGE,
                            test_project.take(),
                            options.validate,
                            options.autofix,
                        )
                        .await?;
                } else {
                    // any other operation is a translation step; its name is
                    // the model the generator should apply
                    source = self
                        .execute_translation_step(
                            ctx,
                            &source,
                            &prompt,
                            PLAN_TARGET_LANGUAGE,
                            &operation.operation_name,
                        )
                        .await?;
                    sent_translation_result = true;
                }
                Ok(())
            }
            .await;

            match step_result {
                Ok(()) => {
                    self.backup_project(
                        ctx,
                        WORKFLOW_EXECUTE_PLAN,
                        format!("source_project_step{step}"),
                        &source,
                    );
                    if let Some(tests) = &test_project {
                        if !tests.is_empty() {
                            self.backup_project(
                                ctx,
                                WORKFLOW_EXECUTE_PLAN,
                                format!("test_project_step{step}"),
                                tests,
                            );
                        }
                    }
                    ctx.events
                        .log_view(format!("Step {step} completed"), LogLevel::Info);
                }
                Err(err) => {
                    error!(step, error = %err, "error occurred during plan step");
                    ctx.events
                        .log_view(format!("Error occurred during step {step}"), LogLevel::Error);
                    failed_steps.push(step);
                }
            }
        }

        if failed_steps.is_empty() {
            let msg = "All steps completed.";
            ctx.events.log_view(msg, LogLevel::Info);
            info!("{msg}");
        } else {
            let listed = failed_steps
                .iter()
                .map(usize::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            let msg = format!("Workflow completed, but some steps failed: {listed}");
            error!("{msg}");
            ctx.events.log_view(msg, LogLevel::Error);
        }

        if !sent_translation_result {
            // the client resolves its pending translation panel only on a
            // result event; echo the current source as a success
            ctx.events
                .translation_result(PickerResponse::success(source.clone()), LogLevel::Info);
        }
        if should_send_test_result && test_project.is_none() {
            ctx.events
                .progress_update(ProgressStep::GenerateUnittests, ProgressState::Error);
        }
        // validation happened per step; resolve the key unconditionally
        ctx.events
            .progress_update(ProgressStep::Validate, ProgressState::Completed);
        Ok(())
    }

    async fn execute_translation_step(
        &self,
        ctx: &RunContext,
        source: &CodeProject,
        instruction: &str,
        target_language: &str,
        model: &str,
    ) -> Result<CodeProject, GatewayError> {
        let response = self
            .tl_generator
            .generate(ctx, source, target_language, model, instruction)
            .await?;
        // plan execution takes the first candidate directly, no picking
        let Some(solution) = response.solutions.first().cloned() else {
            return Err(GatewayError::new(
                ErrorKind::TranslationGeneration,
                "translation generator returned no candidates",
            ));
        };
        ctx.events
            .translation_result(PickerResponse::success(solution.clone()), LogLevel::Info);
        Ok(solution)
    }

    /// Generate tests, optionally validate them through the picker, and
    /// autofix at most once.
    ///
    /// Returns the test project to carry forward: the prior one when
    /// generation fails (a failed attempt must not clobber a working
    /// suite), otherwise the picked or first-generated candidate.
    async fn generate_tests_validated(
        &self,
        ctx: &RunContext,
        source: &CodeProject,
        instruction: &str,
        target_language: &str,
        prior: Option<CodeProject>,
        validate: bool,
        autofix: bool,
    ) -> Result<Option<CodeProject>, GatewayError> {
        // first generation targets the source language: the tests must run
        // against the untranslated project
        let generated = match self
            .ut_generator
            .generate(
                ctx,
                source,
                prior.as_ref(),
                &source.source_language,
                instruction,
            )
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "test generation failed; keeping prior test project");
                return Ok(prior);
            }
        };
        let Some(first) = generated.solutions.first().cloned() else {
            warn!("test generator returned no candidates; keeping prior test project");
            return Ok(prior);
        };

        if !validate {
            ctx.events
                .ut_result(PickerResponse::success(first.clone()), LogLevel::Info);
            return Ok(Some(first));
        }

        let picked = self
            .ut_picker
            .pick(ctx, source, &generated.solutions, &source.source_language)
            .await;

        if !autofix {
            return Ok(Some(picked.solution));
        }

        match picked.return_code {
            ReturnCode::FailedSourceCompile => {
                error!("source project does not compile, cannot autofix");
                Ok(Some(picked.solution))
            }
            ReturnCode::FailedTestCompile | ReturnCode::FailedTestExecution => {
                error!("tests have errors, trying to autofix");
                let diagnostics = if picked.test_output.is_empty() {
                    &picked.error
                } else {
                    &picked.test_output
                };
                let fix_instruction = format!("Please fix this:\n{diagnostics}");
                let regenerated = self
                    .ut_generator
                    .generate(
                        ctx,
                        source,
                        Some(&picked.solution),
                        target_language,
                        &fix_instruction,
                    )
                    .await?;
                let repicked = self
                    .ut_picker
                    .pick(ctx, source, &regenerated.solutions, &source.source_language)
                    .await;
                // one retry only; the second pick stands whatever its outcome
                Ok(Some(repicked.solution))
            }
            _ => Ok(Some(picked.solution)),
        }
    }

    /// Standalone test generation with validation and autofix.
    pub async fn generate_tests(
        &self,
        source_project: CodeProject,
        instruction: &str,
        test_project: Option<CodeProject>,
    ) {
        let ctx = self.begin_run();
        let body = self.generate_tests_body(&ctx, source_project, instruction, test_project);
        self.run_wrapper(WORKFLOW_GENERATE_TESTS, &ctx, body).await;
    }

    async fn generate_tests_body(
        &self,
        ctx: &RunContext,
        source: CodeProject,
        instruction: &str,
        test_project: Option<CodeProject>,
    ) -> Result<(), GatewayError> {
        if !GENERATE_TESTS_LANGUAGES.contains(&source.source_language.as_str()) {
            info!(
                "Generate tests for {} (lang: {}) is not supported; returning",
                source.display_name, source.source_language
            );
            return Ok(());
        }
        info!(
            "Started: Generate tests for {} and lang: {}",
            source.display_name, source.source_language
        );
        self.backup_project(ctx, WORKFLOW_GENERATE_TESTS, "source_project".into(), &source);
        if let Some(tests) = &test_project {
            if !tests.is_empty() {
                self.backup_project(ctx, WORKFLOW_GENERATE_TESTS, "test_project".into(), tests);
            }
        }

        self.generate_tests_validated(
            ctx,
            &source,
            instruction,
            GENERATE_TESTS_TARGET,
            test_project,
            true,
            true,
        )
        .await?;
        Ok(())
    }

    /// Re-run the picking stages over caller-supplied candidate lists,
    /// skipping generation entirely.
    pub async fn retry_with_candidates(
        &self,
        source_project: CodeProject,
        test_candidates: Vec<CodeProject>,
        translation_candidates: Vec<CodeProject>,
        target_language: &str,
    ) {
        let ctx = self.begin_run();
        let body = self.retry_body(
            &ctx,
            source_project,
            test_candidates,
            translation_candidates,
            target_language,
        );
        self.run_wrapper(WORKFLOW_RETRY, &ctx, body).await;
    }

    async fn retry_body(
        &self,
        ctx: &RunContext,
        source: CodeProject,
        test_candidates: Vec<CodeProject>,
        translation_candidates: Vec<CodeProject>,
        target_language: &str,
    ) -> Result<(), GatewayError> {
        // label override: the supplied translations already are target-language code
        let translation_candidates: Vec<CodeProject> = translation_candidates
            .into_iter()
            .map(|mut candidate| {
                candidate.source_language = target_language.to_string();
                candidate
            })
            .collect();

        info!(
            "Started: Retry {} from {} to {}",
            source.display_name, source.source_language, target_language
        );
        self.backup_project(ctx, WORKFLOW_RETRY, "source_project".into(), &source);
        self.backup_candidates(ctx, WORKFLOW_RETRY, "test_candidates".into(), &test_candidates);
        self.backup_candidates(
            ctx,
            WORKFLOW_RETRY,
            "translation_candidates".into(),
            &translation_candidates,
        );

        let ut_pick = self
            .ut_picker
            .pick(ctx, &source, &test_candidates, target_language)
            .await;
        if ut_pick.return_code != ReturnCode::Success {
            return Err(
                GatewayError::new(ErrorKind::TestPick, "Picking unit tests failed").notified(),
            );
        }
        let tl_pick = self
            .tl_picker
            .pick(
                ctx,
                &source,
                &ut_pick.solution,
                &translation_candidates,
                target_language,
            )
            .await;
        if tl_pick.return_code != ReturnCode::Success {
            return Err(
                GatewayError::new(ErrorKind::TranslationPick, "Picking translation failed")
                    .notified(),
            );
        }
        Ok(())
    }

    /// Improve an existing translation: regenerate from the translated
    /// project and validate against tests for the original source.
    pub async fn improve_translation(
        &self,
        source_project: CodeProject,
        test_project: Option<CodeProject>,
        translated_project: CodeProject,
        instruction: &str,
        target_language: &str,
    ) {
        let ctx = self.begin_run();
        let body = self.improve_body(
            &ctx,
            source_project,
            test_project,
            translated_project,
            instruction,
            target_language,
        );
        self.run_wrapper(WORKFLOW_IMPROVE, &ctx, body).await;
    }

    async fn improve_body(
        &self,
        ctx: &RunContext,
        source: CodeProject,
        test_project: Option<CodeProject>,
        mut translated: CodeProject,
        instruction: &str,
        target_language: &str,
    ) -> Result<(), GatewayError> {
        // label override, as in retry: the translation is target-language code
        translated.source_language = target_language.to_string();

        info!(
            "Started: Improve {} with {}",
            source.display_name, instruction
        );
        self.backup_project(ctx, WORKFLOW_IMPROVE, "source_project".into(), &source);
        if let Some(tests) = &test_project {
            if !tests.is_empty() {
                self.backup_project(ctx, WORKFLOW_IMPROVE, "test_project".into(), tests);
            }
        }
        self.backup_project(
            ctx,
            WORKFLOW_IMPROVE,
            "translation_project".into(),
            &translated,
        );

        // regeneration starts from the current best translation, not the
        // original source, and runs while tests are prepared
        let tl_rx = {
            let caller = self.tl_generator.clone();
            let gen_ctx = ctx.clone();
            let gen_source = translated.clone();
            let target = target_language.to_string();
            let instruction = instruction.to_string();
            ctx.spawn_tracked(async move {
                caller
                    .generate(&gen_ctx, &gen_source, &target, DEFAULT_MODEL, &instruction)
                    .await
            })
        };

        let test_projects = match test_project {
            Some(tests) if !tests.is_empty() => vec![tests],
            _ => {
                // no usable tests supplied; generate some, with the
                // improvement instruction as a hint
                let generated = self
                    .ut_generator
                    .generate(ctx, &source, None, target_language, instruction)
                    .await?;
                generated.solutions
            }
        };

        let ut_pick = self
            .ut_picker
            .pick(ctx, &source, &test_projects, target_language)
            .await;
        if ut_pick.return_code != ReturnCode::Success {
            return Err(
                GatewayError::new(ErrorKind::TestPick, "Picking unit tests failed").notified(),
            );
        }

        let tl_gen = join_tracked(tl_rx).await??;
        // the picker's baseline is the translated project: "improve" means
        // better than the current best, not better than the original
        let tl_pick = self
            .tl_picker
            .pick(
                ctx,
                &translated,
                &ut_pick.solution,
                &tl_gen.solutions,
                target_language,
            )
            .await;
        if tl_pick.return_code != ReturnCode::Success {
            return Err(
                GatewayError::new(ErrorKind::TranslationPick, "Picking translation failed")
                    .notified(),
            );
        }
        Ok(())
    }
}

/// Continuation prompt for one plan step: the full plan for context plus a
/// directive narrowing the work to the current operation.
fn build_step_prompt(rendered_plan: &str, operation: &Operation) -> String {
    let mut prompt = rendered_plan.to_string();
    prompt.push_str(&format!(
        "\n\n# Current task: {}.\n{}\n",
        operation.operation_name, operation.description
    ));
    prompt.push_str("Only complete the current task. Avoid working ahead.\n");
    prompt
}

/// Join a tracked stage task. The bag owns the join handle, so the only
/// failure mode here is the task vanishing without sending a result.
async fn join_tracked<T>(rx: oneshot::Receiver<T>) -> Result<T, GatewayError> {
    rx.await
        .map_err(|_| GatewayError::internal("background stage task ended without a result"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_prompt_contains_plan_and_directive() {
        let operation = Operation::new("UPDATE_CSPROJ", "Update the project file.");
        let prompt = build_step_prompt("# AI Plan\n## Step 1: update csproj\n...\n", &operation);
        assert!(prompt.starts_with("# AI Plan\n"));
        assert!(prompt.contains("# Current task: UPDATE_CSPROJ.\nUpdate the project file.\n"));
        assert!(prompt.ends_with("Only complete the current task. Avoid working ahead.\n"));
    }

    #[test]
    fn canned_plan_parses_to_eight_operations() {
        let plan = AiPlan::from_text(CANNED_DOTNET_PLAN).unwrap();
        assert_eq!(plan.operations.len(), 8);
        assert_eq!(plan.operations[0].operation_name, "UPGRADE_DOTNET_PROJECT");
        assert_eq!(plan.operations[7].operation_name, "CLEANUP_OLD_FILES");
    }

    #[test]
    fn execute_plan_options_default_to_full_validation() {
        let options = ExecutePlanOptions::default();
        assert!(options.validate);
        assert!(options.autofix);
    }
}
