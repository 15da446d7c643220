use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use shared::{TreeListResponse, TreeResponse};

use crate::backend::domain::models::tree::TreeRecord as DomainTreeRecord;
use crate::backend::domain::models::Location;
use crate::backend::domain::tree_form::DATE_FORMAT;

pub struct TreeMapper;

impl TreeMapper {
    /// Convert a shared TreeRecord DTO to the domain record
    pub fn to_domain(dto: shared::TreeRecord) -> Result<DomainTreeRecord> {
        let date_planted = NaiveDate::parse_from_str(&dto.date_planted, DATE_FORMAT)
            .with_context(|| format!("Invalid date_planted '{}' for tree {}", dto.date_planted, dto.id))?;
        let location = Location::from_dto(&dto.location)
            .with_context(|| format!("Invalid location for tree {}", dto.id))?;

        Ok(DomainTreeRecord {
            date_planted,
            location,
            created_at: parse_timestamp(&dto.created_at)?,
            updated_at: parse_timestamp(&dto.updated_at)?,
            id: dto.id,
            name: dto.name,
            species: dto.species,
            description: dto.description,
            image_url: dto.image_url,
            submitter: dto.submitter,
        })
    }

    /// Convert a domain record to the shared TreeRecord DTO
    pub fn to_dto(domain: &DomainTreeRecord) -> shared::TreeRecord {
        domain.to_dto()
    }

    pub fn to_domain_list(dtos: Vec<shared::TreeRecord>) -> Result<Vec<DomainTreeRecord>> {
        dtos.into_iter().map(Self::to_domain).collect()
    }

    pub fn to_tree_response(domain: &DomainTreeRecord, success_message: impl Into<String>) -> TreeResponse {
        TreeResponse {
            tree: Self::to_dto(domain),
            success_message: success_message.into(),
        }
    }

    pub fn to_tree_list_response(domain_trees: &[DomainTreeRecord]) -> TreeListResponse {
        TreeListResponse {
            trees: domain_trees.iter().map(Self::to_dto).collect(),
        }
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("Invalid RFC 3339 timestamp '{}'", value))?;
    Ok(parsed.with_timezone(&Utc))
}
