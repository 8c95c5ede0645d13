//! Natural-key upserts for scraped and sample civic records.
//!
//! Each call is a single `INSERT .. ON CONFLICT (natural key) DO UPDATE ..
//! RETURNING *`. The returned row tells whether it was created:
//! `created_at == updated_at` only on the insert path. `created_at` and
//! `trust_score` are never part of the update set.

use crate::orm::elections::{self, ElectionStatus};
use crate::orm::legal_acts;
use crate::orm::politicians::{self, ContactInfo, Expenses, StringList, VotingRecord};
use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ConnectionTrait, DbErr, EntityTrait, NotSet, Set};

/// Score stored on insert until the next scoring pass.
pub const INITIAL_TRUST_SCORE: i32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

impl UpsertOutcome {
    fn from_timestamps(created_at: chrono::NaiveDateTime, updated_at: chrono::NaiveDateTime) -> Self {
        if created_at == updated_at {
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::Updated
        }
    }
}

/// Running insert/update tally for one source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct UpsertCounts {
    pub inserted: u32,
    pub updated: u32,
}

impl UpsertCounts {
    pub fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted => self.inserted += 1,
            UpsertOutcome::Updated => self.updated += 1,
        }
    }

    pub fn add(&mut self, other: UpsertCounts) {
        self.inserted += other.inserted;
        self.updated += other.updated;
    }
}

#[derive(Debug, Clone)]
pub struct ElectionInput {
    /// federal | provincial | municipal
    pub election_type: String,
    pub jurisdiction: String,
    pub title: String,
    pub election_date: NaiveDate,
    pub description: Option<String>,
    pub source_name: Option<String>,
    pub source_url: Option<String>,
    pub registration_deadline: Option<NaiveDate>,
    pub advance_voting_start: Option<NaiveDate>,
    pub advance_voting_end: Option<NaiveDate>,
}

pub async fn upsert_election<C>(
    db: &C,
    input: ElectionInput,
) -> Result<(elections::Model, UpsertOutcome), DbErr>
where
    C: ConnectionTrait,
{
    let now = Utc::now().naive_utc();
    let status = ElectionStatus::for_date(input.election_date, now.date());

    let model = elections::ActiveModel {
        id: NotSet,
        election_type: Set(input.election_type),
        jurisdiction: Set(input.jurisdiction),
        title: Set(input.title),
        election_date: Set(input.election_date),
        status: Set(status),
        description: Set(input.description),
        source_name: Set(input.source_name),
        source_url: Set(input.source_url),
        registration_deadline: Set(input.registration_deadline),
        advance_voting_start: Set(input.advance_voting_start),
        advance_voting_end: Set(input.advance_voting_end),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let row = elections::Entity::insert(model)
        .on_conflict(
            OnConflict::columns([
                elections::Column::ElectionType,
                elections::Column::Jurisdiction,
                elections::Column::Title,
            ])
            .update_columns([
                elections::Column::ElectionDate,
                elections::Column::Status,
                elections::Column::Description,
                elections::Column::SourceName,
                elections::Column::SourceUrl,
                elections::Column::RegistrationDeadline,
                elections::Column::AdvanceVotingStart,
                elections::Column::AdvanceVotingEnd,
                elections::Column::UpdatedAt,
            ])
            .to_owned(),
        )
        .exec_with_returning(db)
        .await?;

    let outcome = UpsertOutcome::from_timestamps(row.created_at, row.updated_at);
    Ok((row, outcome))
}

/// Attributes only sample data carries. Scraped rows leave them untouched.
#[derive(Debug, Clone, Default)]
pub struct PoliticianDetails {
    pub bio: Option<String>,
    pub policy_positions: Vec<String>,
    pub voting_record: VotingRecord,
    pub contact_info: ContactInfo,
    pub committees: Vec<String>,
    pub expenses: Expenses,
    pub is_incumbent: bool,
    pub parliament_member_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PoliticianInput {
    pub name: String,
    pub level: String,
    pub jurisdiction: String,
    pub party: Option<String>,
    pub position: Option<String>,
    pub riding: Option<String>,
    pub civic_level: Option<String>,
    pub source_url: Option<String>,
    pub details: Option<PoliticianDetails>,
}

pub async fn upsert_politician<C>(
    db: &C,
    input: PoliticianInput,
) -> Result<(politicians::Model, UpsertOutcome), DbErr>
where
    C: ConnectionTrait,
{
    use politicians::Column;

    let now = Utc::now().naive_utc();
    let mut update = vec![
        Column::Party,
        Column::Position,
        Column::Riding,
        Column::CivicLevel,
        Column::SourceUrl,
        Column::UpdatedAt,
    ];
    if input.details.is_some() {
        update.extend([
            Column::Bio,
            Column::PolicyPositions,
            Column::VotingRecord,
            Column::ContactInfo,
            Column::Committees,
            Column::Expenses,
            Column::IsIncumbent,
            Column::ParliamentMemberId,
        ]);
    }

    // Scraped members are sitting members.
    let details = input.details.unwrap_or(PoliticianDetails {
        is_incumbent: true,
        ..Default::default()
    });

    let model = politicians::ActiveModel {
        id: NotSet,
        name: Set(input.name),
        party: Set(input.party),
        position: Set(input.position),
        riding: Set(input.riding),
        level: Set(input.level),
        jurisdiction: Set(input.jurisdiction),
        trust_score: Set(INITIAL_TRUST_SCORE),
        civic_level: Set(input.civic_level),
        bio: Set(details.bio),
        policy_positions: Set(StringList(details.policy_positions)),
        voting_record: Set(details.voting_record),
        contact_info: Set(details.contact_info),
        committees: Set(StringList(details.committees)),
        expenses: Set(details.expenses),
        is_incumbent: Set(details.is_incumbent),
        parliament_member_id: Set(details.parliament_member_id),
        source_url: Set(input.source_url),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let row = politicians::Entity::insert(model)
        .on_conflict(
            OnConflict::columns([Column::Name, Column::Level, Column::Jurisdiction])
                .update_columns(update)
                .to_owned(),
        )
        .exec_with_returning(db)
        .await?;

    let outcome = UpsertOutcome::from_timestamps(row.created_at, row.updated_at);
    Ok((row, outcome))
}

#[derive(Debug, Clone)]
pub struct LegalActInput {
    pub title: String,
    pub jurisdiction: String,
    pub act_number: Option<String>,
    pub category: String,
    pub summary: Option<String>,
    pub source_url: Option<String>,
    pub enacted_date: Option<NaiveDate>,
    pub last_amended: Option<NaiveDate>,
}

pub async fn upsert_legal_act<C>(
    db: &C,
    input: LegalActInput,
) -> Result<(legal_acts::Model, UpsertOutcome), DbErr>
where
    C: ConnectionTrait,
{
    use legal_acts::Column;

    let now = Utc::now().naive_utc();
    let mut update = vec![Column::ActNumber, Column::Category, Column::SourceUrl, Column::UpdatedAt];
    // A scraped index entry has no summary or dates; keep what sample data stored.
    if input.summary.is_some() {
        update.push(Column::Summary);
    }
    if input.enacted_date.is_some() {
        update.push(Column::EnactedDate);
    }
    if input.last_amended.is_some() {
        update.push(Column::LastAmended);
    }

    let model = legal_acts::ActiveModel {
        id: NotSet,
        title: Set(input.title),
        act_number: Set(input.act_number),
        jurisdiction: Set(input.jurisdiction),
        category: Set(input.category),
        summary: Set(input.summary),
        source_url: Set(input.source_url),
        enacted_date: Set(input.enacted_date),
        last_amended: Set(input.last_amended),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let row = legal_acts::Entity::insert(model)
        .on_conflict(
            OnConflict::columns([Column::Title, Column::Jurisdiction])
                .update_columns(update)
                .to_owned(),
        )
        .exec_with_returning(db)
        .await?;

    let outcome = UpsertOutcome::from_timestamps(row.created_at, row.updated_at);
    Ok((row, outcome))
}
