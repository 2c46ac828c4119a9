use super::common;
use crate::analysis::AnalysisResult;
use crate::config::EffectiveConfig;
use crate::error::{DorguError, Result};
use crate::paths::DEPLOYMENT_FILE;

pub const GITHUB_ACTIONS: &str = "github-actions";
pub const REGISTRY_PLACEHOLDER: &str = "ghcr.io/${{ github.repository_owner }}";

const WORKFLOW_TEMPLATE: &str = r#"name: Build and Deploy

on:
  push:
    branches:
      - main
      - master
  pull_request:
    branches:
      - main
      - master

env:
  REGISTRY: __REGISTRY__
  IMAGE_NAME: __IMAGE__

jobs:
  build:
    runs-on: ubuntu-latest
    permissions:
      contents: read
      packages: write

    steps:
      - name: Checkout repository
        uses: actions/checkout@v4

      - name: Set up Docker Buildx
        uses: docker/setup-buildx-action@v3

      - name: Log in to Container Registry
        if: github.event_name != 'pull_request'
        uses: docker/login-action@v3
        with:
          registry: ${{ env.REGISTRY }}
          username: ${{ github.actor }}
          password: ${{ secrets.GITHUB_TOKEN }}

      - name: Extract metadata
        id: meta
        uses: docker/metadata-action@v5
        with:
          images: ${{ env.IMAGE_NAME }}
          tags: |
            type=ref,event=branch
            type=ref,event=pr
            type=sha,prefix=
            type=raw,value=latest,enable={{is_default_branch}}

      - name: Build and push
        uses: docker/build-push-action@v5
        with:
          context: .
          push: ${{ github.event_name != 'pull_request' }}
          tags: ${{ steps.meta.outputs.tags }}
          labels: ${{ steps.meta.outputs.labels }}
          cache-from: type=gha
          cache-to: type=gha,mode=max

  deploy:
    needs: build
    runs-on: ubuntu-latest
    if: github.event_name != 'pull_request'

    steps:
      - name: Checkout repository
        uses: actions/checkout@v4

      - name: Update image tag in manifests
        run: |
          SHORT_SHA=$(echo ${{ github.sha }} | cut -c1-7)
          sed -i "s|image: .*__APP__.*|image: ${{ env.IMAGE_NAME }}:${SHORT_SHA}|g" __MANIFESTS__/__DEPLOYMENT__

      - name: Commit and push changes
        run: |
          git config --local user.email "github-actions[bot]@users.noreply.github.com"
          git config --local user.name "github-actions[bot]"
          git add __MANIFESTS__/
          git diff --staged --quiet || git commit -m "chore: update image to ${{ github.sha }}"
          git push
"#;

/// GitHub Actions workflow that builds the image and patches the image tag
/// in the committed workload document.
pub fn generate(
    analysis: &AnalysisResult,
    _namespace: &str,
    config: &EffectiveConfig,
) -> Result<String> {
    common::require_name(analysis)?;
    if config.ci.provider != GITHUB_ACTIONS {
        return Err(DorguError::UnsupportedCiProvider(config.ci.provider.clone()));
    }

    let registry = match config.ci.registry.trim_end_matches('/') {
        "" => REGISTRY_PLACEHOLDER,
        r => r,
    };
    let manifests = match config.gitops.path.trim_end_matches('/') {
        "" => crate::paths::DEFAULT_OUTPUT_DIR,
        p => p,
    };

    Ok(WORKFLOW_TEMPLATE
        .replace("__REGISTRY__", registry)
        .replace("__IMAGE__", &format!("{registry}/{}", analysis.name))
        .replace("__APP__", &analysis.name)
        .replace("__MANIFESTS__", manifests)
        .replace("__DEPLOYMENT__", DEPLOYMENT_FILE))
}
