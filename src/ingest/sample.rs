//! Built-in records used when a live source yields nothing.
//!
//! Every function is idempotent: elections, politicians and acts go through
//! the natural-key upserts, candidates are written only for elections that
//! have none, and cases are written only into an empty table.

use super::upsert::{
    upsert_election, upsert_legal_act, upsert_politician, ElectionInput, LegalActInput,
    PoliticianDetails, PoliticianInput, UpsertCounts,
};
use crate::orm::legal_acts::CATEGORY_CRIMINAL_CODE;
use crate::orm::politicians::{ContactInfo, Expenses, VotingRecord};
use crate::orm::{candidate_policies, electoral_candidates, legal_cases};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, NotSet, PaginatorTrait, QueryFilter, Set,
};

/// Category for federal statutes other than the Criminal Code.
pub const CATEGORY_FEDERAL_ACT: &str = "federal-act";
pub const CATEGORY_CONSTITUTIONAL: &str = "constitutional";

fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

struct SamplePolicy {
    title: &'static str,
    description: &'static str,
    category: &'static str,
    estimated_cost: &'static str,
    timeline: &'static str,
}

struct SampleCandidate {
    name: &'static str,
    party: &'static str,
    riding: &'static str,
    is_incumbent: bool,
    platform: &'static str,
    policies: Vec<SamplePolicy>,
}

struct SampleElection {
    election: ElectionInput,
    candidates: Vec<SampleCandidate>,
}

fn sample_elections(level: &str) -> Vec<SampleElection> {
    match level {
        "federal" => vec![SampleElection {
            election: ElectionInput {
                election_type: "federal".to_string(),
                jurisdiction: "Canada".to_string(),
                title: "45th Canadian Federal General Election".to_string(),
                election_date: NaiveDate::from_ymd_opt(2025, 4, 28).unwrap_or_default(),
                description: Some(
                    "General election for all 343 seats in the House of Commons.".to_string(),
                ),
                source_name: Some("Elections Canada (sample data)".to_string()),
                source_url: Some("https://www.elections.ca".to_string()),
                registration_deadline: date(2025, 4, 22),
                advance_voting_start: date(2025, 4, 18),
                advance_voting_end: date(2025, 4, 21),
            },
            candidates: vec![
                SampleCandidate {
                    name: "Avery Tremblay",
                    party: "Liberal",
                    riding: "Ottawa Centre",
                    is_incumbent: true,
                    platform: "Housing supply, transit investment and public service modernization.",
                    policies: vec![
                        SamplePolicy {
                            title: "National housing accelerator",
                            description: "Fund municipalities that cut approval times for new rental housing.",
                            category: "housing",
                            estimated_cost: "$4.0B over 4 years",
                            timeline: "2025-2029",
                        },
                        SamplePolicy {
                            title: "Light rail partnership",
                            description: "Federal cost share for the next transit expansion phase.",
                            category: "transportation",
                            estimated_cost: "$1.2B",
                            timeline: "2026-2030",
                        },
                    ],
                },
                SampleCandidate {
                    name: "Morgan Leblanc",
                    party: "Conservative",
                    riding: "Ottawa Centre",
                    is_incumbent: false,
                    platform: "Lower income taxes, faster permitting and balanced budgets.",
                    policies: vec![SamplePolicy {
                        title: "Permit fast-track",
                        description: "Tie infrastructure transfers to permit approval timelines.",
                        category: "economy",
                        estimated_cost: "Revenue neutral",
                        timeline: "First 100 days",
                    }],
                },
                SampleCandidate {
                    name: "Riley Singh",
                    party: "NDP",
                    riding: "Ottawa Centre",
                    is_incumbent: false,
                    platform: "Pharmacare expansion, dental coverage and renter protections.",
                    policies: vec![SamplePolicy {
                        title: "Universal pharmacare",
                        description: "Single-payer coverage for essential prescription drugs.",
                        category: "healthcare",
                        estimated_cost: "$11B per year",
                        timeline: "Phased over 3 years",
                    }],
                },
            ],
        }],
        "provincial" => vec![SampleElection {
            election: ElectionInput {
                election_type: "provincial".to_string(),
                jurisdiction: "Ontario".to_string(),
                title: "44th Ontario General Election".to_string(),
                election_date: NaiveDate::from_ymd_opt(2025, 2, 27).unwrap_or_default(),
                description: Some(
                    "General election for the 124 seats of the Legislative Assembly of Ontario."
                        .to_string(),
                ),
                source_name: Some("Elections Ontario (sample data)".to_string()),
                source_url: Some("https://www.elections.on.ca".to_string()),
                registration_deadline: None,
                advance_voting_start: date(2025, 2, 20),
                advance_voting_end: date(2025, 2, 22),
            },
            candidates: vec![
                SampleCandidate {
                    name: "Jordan Okafor",
                    party: "Progressive Conservative",
                    riding: "Brampton East",
                    is_incumbent: true,
                    platform: "Highway expansion and manufacturing incentives.",
                    policies: vec![SamplePolicy {
                        title: "Highway 413 completion",
                        description: "Complete the new GTA West corridor.",
                        category: "transportation",
                        estimated_cost: "$8B",
                        timeline: "2025-2032",
                    }],
                },
                SampleCandidate {
                    name: "Casey Nguyen",
                    party: "Ontario Liberal",
                    riding: "Brampton East",
                    is_incumbent: false,
                    platform: "Family doctors for every resident and classroom size caps.",
                    policies: vec![SamplePolicy {
                        title: "Primary care guarantee",
                        description: "Attach every Ontarian to a family doctor or team.",
                        category: "healthcare",
                        estimated_cost: "$3.1B",
                        timeline: "By 2029",
                    }],
                },
            ],
        }],
        "municipal" => vec![SampleElection {
            election: ElectionInput {
                election_type: "municipal".to_string(),
                jurisdiction: "Toronto".to_string(),
                title: "2026 Toronto Municipal Election".to_string(),
                election_date: NaiveDate::from_ymd_opt(2026, 10, 26).unwrap_or_default(),
                description: Some("Election of the mayor, city councillors and school board trustees.".to_string()),
                source_name: Some("City of Toronto (sample data)".to_string()),
                source_url: Some("https://www.toronto.ca/city-government/elections/".to_string()),
                registration_deadline: date(2026, 8, 21),
                advance_voting_start: date(2026, 10, 8),
                advance_voting_end: date(2026, 10, 14),
            },
            candidates: vec![SampleCandidate {
                name: "Sam Delgado",
                party: "Independent",
                riding: "Ward 10 Spadina-Fort York",
                is_incumbent: false,
                platform: "Safer streets, transit reliability and property tax restraint.",
                policies: vec![SamplePolicy {
                    title: "Vision Zero completion",
                    description: "Protected bike lanes and signal timing on high-injury corridors.",
                    category: "transportation",
                    estimated_cost: "$120M",
                    timeline: "2027-2030",
                }],
            }],
        }],
        _ => Vec::new(),
    }
}

async fn populate_candidates<C>(
    db: &C,
    election_id: i32,
    candidates: Vec<SampleCandidate>,
) -> Result<u32, DbErr>
where
    C: ConnectionTrait,
{
    let existing = electoral_candidates::Entity::find()
        .filter(electoral_candidates::Column::ElectionId.eq(election_id))
        .count(db)
        .await?;
    if existing > 0 {
        return Ok(0);
    }

    let now = Utc::now().naive_utc();
    let mut created = 0;
    for candidate in candidates {
        let result = electoral_candidates::Entity::insert(electoral_candidates::ActiveModel {
            id: NotSet,
            election_id: Set(election_id),
            name: Set(candidate.name.to_string()),
            party: Set(Some(candidate.party.to_string())),
            riding: Set(Some(candidate.riding.to_string())),
            is_incumbent: Set(candidate.is_incumbent),
            platform: Set(Some(candidate.platform.to_string())),
            created_at: Set(now),
        })
        .exec(db)
        .await?;

        let policies = candidate
            .policies
            .into_iter()
            .map(|p| candidate_policies::ActiveModel {
                id: NotSet,
                candidate_id: Set(result.last_insert_id),
                title: Set(p.title.to_string()),
                description: Set(Some(p.description.to_string())),
                category: Set(Some(p.category.to_string())),
                estimated_cost: Set(Some(p.estimated_cost.to_string())),
                timeline: Set(Some(p.timeline.to_string())),
                created_at: Set(now),
            })
            .collect::<Vec<_>>();

        if !policies.is_empty() {
            candidate_policies::Entity::insert_many(policies).exec(db).await?;
        }
        created += 1;
    }

    Ok(created)
}

/// Sample elections of one level (federal, provincial or municipal), with
/// their candidates and platforms.
pub async fn populate_sample_elections<C>(db: &C, level: &str) -> Result<UpsertCounts, DbErr>
where
    C: ConnectionTrait,
{
    let mut counts = UpsertCounts::default();
    for sample in sample_elections(level) {
        let (election, outcome) = upsert_election(db, sample.election).await?;
        counts.record(outcome);
        let candidates = populate_candidates(db, election.id, sample.candidates).await?;
        log::debug!(
            "Sample election '{}' ready with {} new candidates",
            election.title,
            candidates
        );
    }
    Ok(counts)
}

fn sample_politicians() -> Vec<PoliticianInput> {
    vec![
        PoliticianInput {
            name: "Avery Tremblay".to_string(),
            level: "federal".to_string(),
            jurisdiction: "Canada".to_string(),
            party: Some("Liberal".to_string()),
            position: Some("Member of Parliament".to_string()),
            riding: Some("Ottawa Centre".to_string()),
            civic_level: Some("urban".to_string()),
            source_url: None,
            details: Some(PoliticianDetails {
                bio: Some("Former city planner first elected in 2019.".to_string()),
                policy_positions: strings(&["Housing affordability", "Public transit", "Climate action"]),
                voting_record: VotingRecord { yes: 412, no: 96, abstain: 31 },
                contact_info: ContactInfo {
                    email: Some("avery.tremblay@parl.example.ca".to_string()),
                    phone: Some("613-555-0142".to_string()),
                    office: Some("Wellington Building, Ottawa".to_string()),
                    website: None,
                },
                committees: strings(&["Finance", "Transport, Infrastructure and Communities"]),
                expenses: Expenses {
                    travel: 98_400.0,
                    hospitality: 6_250.0,
                    office: 172_300.0,
                    total: 276_950.0,
                    year: Some(2024),
                },
                is_incumbent: true,
                parliament_member_id: Some("sample-1001".to_string()),
            }),
        },
        PoliticianInput {
            name: "Morgan Leblanc".to_string(),
            level: "federal".to_string(),
            jurisdiction: "Canada".to_string(),
            party: Some("Conservative".to_string()),
            position: Some("Member of Parliament".to_string()),
            riding: Some("Beauce".to_string()),
            civic_level: Some("rural".to_string()),
            source_url: None,
            details: Some(PoliticianDetails {
                bio: Some("Small business owner and former municipal councillor.".to_string()),
                policy_positions: strings(&["Tax relief", "Agriculture", "Rural broadband", "Balanced budgets"]),
                voting_record: VotingRecord { yes: 205, no: 298, abstain: 12 },
                contact_info: ContactInfo {
                    email: Some("morgan.leblanc@parl.example.ca".to_string()),
                    ..Default::default()
                },
                committees: strings(&["Agriculture and Agri-Food", "Industry and Technology", "Public Accounts"]),
                expenses: Expenses {
                    travel: 301_000.0,
                    hospitality: 12_500.0,
                    office: 195_000.0,
                    total: 508_500.0,
                    year: Some(2024),
                },
                is_incumbent: true,
                parliament_member_id: Some("sample-1002".to_string()),
            }),
        },
        PoliticianInput {
            name: "Jordan Okafor".to_string(),
            level: "provincial".to_string(),
            jurisdiction: "Ontario".to_string(),
            party: Some("Progressive Conservative".to_string()),
            position: Some("Member of Provincial Parliament".to_string()),
            riding: Some("Brampton East".to_string()),
            civic_level: Some("suburban".to_string()),
            source_url: None,
            details: Some(PoliticianDetails {
                bio: Some("Engineer serving a second term at Queen's Park.".to_string()),
                policy_positions: strings(&["Transportation", "Manufacturing jobs"]),
                voting_record: VotingRecord { yes: 188, no: 40, abstain: 22 },
                committees: strings(&["Standing Committee on Finance and Economic Affairs"]),
                expenses: Expenses {
                    travel: 22_000.0,
                    hospitality: 3_100.0,
                    office: 118_000.0,
                    total: 143_100.0,
                    year: Some(2024),
                },
                is_incumbent: true,
                ..Default::default()
            }),
        },
        PoliticianInput {
            name: "Casey Nguyen".to_string(),
            level: "provincial".to_string(),
            jurisdiction: "Ontario".to_string(),
            party: Some("Ontario Liberal".to_string()),
            position: Some("Candidate".to_string()),
            riding: Some("Brampton East".to_string()),
            civic_level: Some("suburban".to_string()),
            source_url: None,
            details: Some(PoliticianDetails {
                bio: Some("Family physician and first-time candidate.".to_string()),
                policy_positions: strings(&["Primary care", "Education"]),
                ..Default::default()
            }),
        },
        PoliticianInput {
            name: "Sam Delgado".to_string(),
            level: "municipal".to_string(),
            jurisdiction: "Toronto".to_string(),
            party: None,
            position: Some("City Councillor".to_string()),
            riding: Some("Ward 10 Spadina-Fort York".to_string()),
            civic_level: Some("urban".to_string()),
            source_url: None,
            details: Some(PoliticianDetails {
                bio: Some("Community organizer focused on street safety.".to_string()),
                policy_positions: strings(&["Road safety", "Transit reliability", "Affordable housing"]),
                voting_record: VotingRecord { yes: 640, no: 210, abstain: 150 },
                committees: strings(&["Infrastructure and Environment", "Budget"]),
                expenses: Expenses {
                    office: 41_000.0,
                    total: 41_000.0,
                    year: Some(2024),
                    ..Default::default()
                },
                is_incumbent: true,
                ..Default::default()
            }),
        },
    ]
}

pub async fn populate_sample_politicians<C>(db: &C) -> Result<UpsertCounts, DbErr>
where
    C: ConnectionTrait,
{
    let mut counts = UpsertCounts::default();
    for input in sample_politicians() {
        let (_, outcome) = upsert_politician(db, input).await?;
        counts.record(outcome);
    }
    Ok(counts)
}

fn act(
    title: &str,
    act_number: &str,
    category: &str,
    summary: &str,
    source_url: &str,
    enacted: Option<NaiveDate>,
) -> LegalActInput {
    LegalActInput {
        title: title.to_string(),
        jurisdiction: "Canada".to_string(),
        act_number: Some(act_number.to_string()),
        category: category.to_string(),
        summary: Some(summary.to_string()),
        source_url: Some(source_url.to_string()),
        enacted_date: enacted,
        last_amended: None,
    }
}

fn sample_legal_acts() -> Vec<LegalActInput> {
    const CC_URL: &str = "https://laws-lois.justice.gc.ca/eng/acts/C-46/";

    vec![
        act(
            "Criminal Code",
            "R.S.C., 1985, c. C-46",
            CATEGORY_CRIMINAL_CODE,
            "Federal statute defining most criminal offences and criminal procedure in Canada.",
            CC_URL,
            date(1985, 1, 1),
        ),
        act(
            "Criminal Code, s. 265: Assault",
            "s. 265",
            CATEGORY_CRIMINAL_CODE,
            "Applying force intentionally to another person without consent, or attempting or threatening to do so.",
            CC_URL,
            None,
        ),
        act(
            "Criminal Code, s. 322: Theft",
            "s. 322",
            CATEGORY_CRIMINAL_CODE,
            "Fraudulently taking or converting anything with intent to deprive the owner of it.",
            CC_URL,
            None,
        ),
        act(
            "Criminal Code, s. 380: Fraud",
            "s. 380",
            CATEGORY_CRIMINAL_CODE,
            "Defrauding the public or any person of property, money, valuable security or service by deceit or falsehood.",
            CC_URL,
            None,
        ),
        act(
            "Criminal Code, s. 320.14: Impaired operation",
            "s. 320.14",
            CATEGORY_CRIMINAL_CODE,
            "Operating a conveyance while ability is impaired by alcohol or a drug, or over the legal blood concentration.",
            CC_URL,
            None,
        ),
        act(
            "Canadian Charter of Rights and Freedoms",
            "Part I, Constitution Act, 1982",
            CATEGORY_CONSTITUTIONAL,
            "Guarantees fundamental freedoms, democratic, mobility, legal and equality rights.",
            "https://laws-lois.justice.gc.ca/eng/const/page-12.html",
            date(1982, 4, 17),
        ),
        act(
            "Canada Elections Act",
            "S.C. 2000, c. 9",
            CATEGORY_FEDERAL_ACT,
            "Governs the conduct of federal elections, political financing and third-party advertising.",
            "https://laws-lois.justice.gc.ca/eng/acts/E-2.01/",
            date(2000, 5, 31),
        ),
        act(
            "Access to Information Act",
            "R.S.C., 1985, c. A-1",
            CATEGORY_FEDERAL_ACT,
            "Provides a right of access to records under the control of federal government institutions.",
            "https://laws-lois.justice.gc.ca/eng/acts/A-1/",
            date(1983, 7, 1),
        ),
        act(
            "Privacy Act",
            "R.S.C., 1985, c. P-21",
            CATEGORY_FEDERAL_ACT,
            "Protects personal information held by federal institutions and grants individuals access to it.",
            "https://laws-lois.justice.gc.ca/eng/acts/P-21/",
            date(1983, 7, 1),
        ),
    ]
}

fn sample_legal_cases() -> Vec<(&'static str, &'static str, &'static str, Option<NaiveDate>, &'static str)> {
    vec![
        (
            "R. v. Jordan",
            "2016 SCC 27",
            "Supreme Court of Canada",
            date(2016, 7, 8),
            "Set presumptive ceilings for unreasonable delay under s. 11(b) of the Charter.",
        ),
        (
            "R. v. Oakes",
            "[1986] 1 SCR 103",
            "Supreme Court of Canada",
            date(1986, 2, 28),
            "Established the test for justifying limits on Charter rights under s. 1.",
        ),
        (
            "Carter v. Canada (Attorney General)",
            "2015 SCC 5",
            "Supreme Court of Canada",
            date(2015, 2, 6),
            "Struck down the blanket prohibition on physician-assisted dying.",
        ),
        (
            "Reference re Secession of Quebec",
            "[1998] 2 SCR 217",
            "Supreme Court of Canada",
            date(1998, 8, 20),
            "Held that unilateral secession is unlawful but a clear referendum result triggers a duty to negotiate.",
        ),
    ]
}

/// Reference rulings, written once into an empty table.
pub async fn populate_sample_legal_cases<C>(db: &C) -> Result<u32, DbErr>
where
    C: ConnectionTrait,
{
    if legal_cases::Entity::find().count(db).await? > 0 {
        return Ok(0);
    }

    let now = Utc::now().naive_utc();
    let cases = sample_legal_cases();
    let created = cases.len() as u32;
    let models = cases
        .into_iter()
        .map(|(name, citation, court, decided, summary)| legal_cases::ActiveModel {
            id: NotSet,
            case_name: Set(name.to_string()),
            citation: Set(citation.to_string()),
            court: Set(court.to_string()),
            jurisdiction: Set("Canada".to_string()),
            decision_date: Set(decided),
            summary: Set(Some(summary.to_string())),
            created_at: Set(now),
        });

    legal_cases::Entity::insert_many(models).exec(db).await?;
    Ok(created)
}

/// Sample acts, Criminal Code sections and reference rulings.
pub async fn populate_sample_legal_acts<C>(db: &C) -> Result<UpsertCounts, DbErr>
where
    C: ConnectionTrait,
{
    let mut counts = UpsertCounts::default();
    for input in sample_legal_acts() {
        let (_, outcome) = upsert_legal_act(db, input).await?;
        counts.record(outcome);
    }
    populate_sample_legal_cases(db).await?;
    Ok(counts)
}
