use crate::cli::Commands;
use anyhow::{Context, Result};
use gh_client::{CreatePullRequest, GitHubClient};
use std::collections::HashMap;

/// Run one subcommand and return what should be printed
pub async fn run(client: &dyn GitHubClient, command: Commands) -> Result<String> {
    log::debug!("Running {:?}", command);

    match command {
        Commands::Whoami => client.viewer_login().await.context("failed to fetch viewer"),

        Commands::RepoInfo { repo } => {
            let info = client
                .repository_info(&repo.owner, &repo.repo)
                .await
                .with_context(|| format!("failed to fetch {}/{}", repo.owner, repo.repo))?;
            Ok(serde_json::to_string_pretty(&info)?)
        }

        Commands::FindPr { repo, branch } => {
            let number = client
                .find_pr_for_branch(&repo.owner, &repo.repo, &branch)
                .await
                .with_context(|| format!("failed to look up PR for branch {branch}"))?;
            Ok(match number {
                Some(number) => number.to_string(),
                None => format!("no open pull request for branch {branch}"),
            })
        }

        Commands::ShowPr { repo, number } => {
            let pr = client
                .fetch_pull_request(&repo.owner, &repo.repo, number)
                .await
                .with_context(|| format!("failed to fetch PR #{number}"))?;
            Ok(serde_json::to_string_pretty(&pr)?)
        }

        Commands::CreatePr {
            repo,
            base,
            head,
            title,
            body,
        } => {
            let info = client
                .repository_info(&repo.owner, &repo.repo)
                .await
                .with_context(|| format!("failed to fetch {}/{}", repo.owner, repo.repo))?;
            let request = CreatePullRequest {
                repository_id: info.id,
                base_ref_name: base,
                head_ref_name: head,
                title,
                body,
            };
            let number = client
                .create_pull_request(&request)
                .await
                .context("failed to create pull request")?;
            Ok(number.to_string())
        }

        Commands::Approve {
            repo,
            number,
            message,
        } => {
            client
                .approve_pull_request(&repo.owner, &repo.repo, number, &message)
                .await
                .with_context(|| format!("failed to approve PR #{number}"))?;
            Ok(format!("approved #{number}"))
        }

        Commands::Merge {
            repo,
            number,
            method,
        } => {
            client
                .merge_pull_request(&repo.owner, &repo.repo, number, method.into())
                .await
                .with_context(|| format!("failed to merge PR #{number}"))?;
            Ok(format!("merged #{number}"))
        }

        Commands::AutoMerge {
            repo,
            number,
            method,
        } => {
            client
                .enable_auto_merge(&repo.owner, &repo.repo, number, method.into())
                .await
                .with_context(|| format!("failed to enable auto-merge for PR #{number}"))?;
            Ok(format!("auto-merge enabled for #{number}"))
        }

        Commands::Comment { repo, number, body } => {
            client
                .add_comment(&repo.owner, &repo.repo, number, &body)
                .await
                .with_context(|| format!("failed to comment on PR #{number}"))?;
            Ok(format!("commented on #{number}"))
        }

        Commands::TriggerWorkflow {
            repo,
            workflow,
            git_ref,
            inputs,
        } => {
            let inputs: HashMap<String, String> = inputs.into_iter().collect();
            client
                .trigger_workflow(&repo.owner, &repo.repo, &workflow, &git_ref, &inputs)
                .await
                .with_context(|| format!("failed to trigger workflow {workflow}"))?;
            Ok(format!("dispatched {workflow} on {git_ref}"))
        }

        Commands::Token => client
            .access_token()
            .await
            .context("failed to obtain access token"),
    }
}
