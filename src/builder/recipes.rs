//! Position recipes.
//!
//! Each recipe maps a row onto the player table: the attributes every player
//! carries, followed by the ratings its position group uses. Recipes are
//! plain table entries; a new position is a new entry in [`POSITION_RECIPES`].

use super::convert::{parse_height, parse_jersey, stored_weight};
use super::{PlanContext, PlanDraft, RecordBuilder, RecordPlan};
use crate::constants::{FREE_AGENT_TEAM, attributes as attr, fields, team_id};
use crate::error::{RosterError, Result};
use crate::models::PlayerRow;

/// Ratings shared by every position: (CSV attribute, engine field)
const COMMON_RATINGS: &[(&str, &str)] = &[
    (attr::OVERALL, fields::OVERALL),
    (attr::SPEED, fields::SPEED),
    (attr::STRENGTH, fields::STRENGTH),
    (attr::AWARENESS, fields::AWARENESS),
    (attr::AGILITY, fields::AGILITY),
    (attr::ACCELERATION, fields::ACCELERATION),
    (attr::STAMINA, fields::STAMINA),
    (attr::INJURY, fields::INJURY),
    (attr::TOUGHNESS, fields::TOUGHNESS),
];

/// Plain attributes copied through after the identity fields
const PROFILE: &[(&str, &str)] = &[
    (attr::AGE, fields::AGE),
    (attr::YEARS_PRO, fields::YEARS_PRO),
];

/// Groups of positions that share a rating set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionGroup {
    Quarterback,
    Halfback,
    Fullback,
    Receiver,
    TightEnd,
    OffensiveLine,
    DefensiveLine,
    Linebacker,
    DefensiveBack,
    Kicking,
}

impl PositionGroup {
    /// Group-specific ratings, in write order
    pub fn ratings(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            PositionGroup::Quarterback => &[
                (attr::THROW_POWER, fields::THROW_POWER),
                (attr::THROW_ACCURACY, fields::THROW_ACCURACY),
                (attr::CARRYING, fields::CARRYING),
                (attr::BREAK_TACKLE, fields::BREAK_TACKLE),
            ],
            PositionGroup::Halfback => &[
                (attr::CARRYING, fields::CARRYING),
                (attr::BREAK_TACKLE, fields::BREAK_TACKLE),
                (attr::CATCHING, fields::CATCHING),
                (attr::KICK_RETURN, fields::KICK_RETURN),
            ],
            PositionGroup::Fullback => &[
                (attr::CARRYING, fields::CARRYING),
                (attr::BREAK_TACKLE, fields::BREAK_TACKLE),
                (attr::CATCHING, fields::CATCHING),
                (attr::RUN_BLOCKING, fields::RUN_BLOCKING),
            ],
            PositionGroup::Receiver => &[
                (attr::CATCHING, fields::CATCHING),
                (attr::JUMPING, fields::JUMPING),
                (attr::CARRYING, fields::CARRYING),
                (attr::KICK_RETURN, fields::KICK_RETURN),
            ],
            PositionGroup::TightEnd => &[
                (attr::CATCHING, fields::CATCHING),
                (attr::RUN_BLOCKING, fields::RUN_BLOCKING),
                (attr::PASS_BLOCKING, fields::PASS_BLOCKING),
                (attr::BREAK_TACKLE, fields::BREAK_TACKLE),
            ],
            PositionGroup::OffensiveLine => &[
                (attr::PASS_BLOCKING, fields::PASS_BLOCKING),
                (attr::RUN_BLOCKING, fields::RUN_BLOCKING),
            ],
            PositionGroup::DefensiveLine => &[(attr::TACKLE, fields::TACKLE)],
            PositionGroup::Linebacker => &[
                (attr::TACKLE, fields::TACKLE),
                (attr::CATCHING, fields::CATCHING),
            ],
            PositionGroup::DefensiveBack => &[
                (attr::TACKLE, fields::TACKLE),
                (attr::CATCHING, fields::CATCHING),
                (attr::JUMPING, fields::JUMPING),
                (attr::KICK_RETURN, fields::KICK_RETURN),
            ],
            PositionGroup::Kicking => &[
                (attr::KICK_POWER, fields::KICK_POWER),
                (attr::KICK_ACCURACY, fields::KICK_ACCURACY),
            ],
        }
    }
}

/// Field-assignment recipe for one position code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionRecipe {
    pub code: &'static str,
    /// Value stored in the position field
    pub position_id: u32,
    pub group: PositionGroup,
}

const fn recipe(code: &'static str, position_id: u32, group: PositionGroup) -> PositionRecipe {
    PositionRecipe {
        code,
        position_id,
        group,
    }
}

/// Every position the importer builds, in engine position-id order
pub const POSITION_RECIPES: &[PositionRecipe] = &[
    recipe("QB", 0, PositionGroup::Quarterback),
    recipe("HB", 1, PositionGroup::Halfback),
    recipe("FB", 2, PositionGroup::Fullback),
    recipe("WR", 3, PositionGroup::Receiver),
    recipe("TE", 4, PositionGroup::TightEnd),
    recipe("LT", 5, PositionGroup::OffensiveLine),
    recipe("LG", 6, PositionGroup::OffensiveLine),
    recipe("C", 7, PositionGroup::OffensiveLine),
    recipe("RG", 8, PositionGroup::OffensiveLine),
    recipe("RT", 9, PositionGroup::OffensiveLine),
    recipe("LE", 10, PositionGroup::DefensiveLine),
    recipe("RE", 11, PositionGroup::DefensiveLine),
    recipe("DT", 12, PositionGroup::DefensiveLine),
    recipe("LOLB", 13, PositionGroup::Linebacker),
    recipe("MLB", 14, PositionGroup::Linebacker),
    recipe("ROLB", 15, PositionGroup::Linebacker),
    recipe("CB", 16, PositionGroup::DefensiveBack),
    recipe("FS", 17, PositionGroup::DefensiveBack),
    recipe("SS", 18, PositionGroup::DefensiveBack),
    recipe("K", 19, PositionGroup::Kicking),
    recipe("P", 20, PositionGroup::Kicking),
];

impl RecordBuilder for PositionRecipe {
    fn code(&self) -> &'static str {
        self.code
    }

    fn plan(&self, row: &PlayerRow, ctx: &mut PlanContext<'_>) -> Result<RecordPlan> {
        let config = ctx.config;

        let (team_key, team_value) = match row.get(attr::TEAM) {
            None => (FREE_AGENT_TEAM.to_string(), config.free_agent_team_id),
            Some(team) => {
                let id = team_id(team).ok_or_else(|| RosterError::InvalidValue {
                    field: attr::TEAM.to_string(),
                    value: team.to_string(),
                    reason: "unknown team abbreviation".to_string(),
                })?;
                (team.to_ascii_uppercase(), id)
            }
        };
        let requested = row.get(attr::JERSEY_NUMBER).map(parse_jersey).transpose()?;
        let height = row.get(attr::HEIGHT).map(parse_height).transpose()?;
        let weight = row
            .get(attr::WEIGHT)
            .map(|raw| stored_weight(raw, config.weight_offset))
            .transpose()?;
        let (draft_round, draft_pick) = match row.get(attr::DRAFT_ROUND) {
            None => (
                Some(config.undrafted_round.to_string()),
                Some(config.undrafted_pick.to_string()),
            ),
            Some(round) => (
                Some(round.to_string()),
                row.get(attr::DRAFT_PICK).map(str::to_string),
            ),
        };

        let mut draft = PlanDraft::new(ctx.catalog, &config.player_table);
        draft.push_opt(fields::FIRST_NAME, row.get(attr::FIRST_NAME))?;
        draft.push_opt(fields::LAST_NAME, row.get(attr::LAST_NAME))?;
        draft.push(fields::POSITION, &self.position_id.to_string())?;
        draft.push(fields::TEAM_ID, &team_value.to_string())?;
        draft.push_jersey(fields::JERSEY_NUMBER)?;
        if let Some(height) = height {
            draft.push(fields::HEIGHT, &height.to_string())?;
        }
        if let Some(weight) = weight {
            draft.push(fields::WEIGHT, &weight.to_string())?;
        }
        for &(attribute, field) in PROFILE {
            draft.push_opt(field, row.get(attribute))?;
        }
        draft.push_opt(fields::DRAFT_ROUND, draft_round.as_deref())?;
        draft.push_opt(fields::DRAFT_PICK, draft_pick.as_deref())?;
        for &(attribute, field) in COMMON_RATINGS.iter().chain(self.group.ratings()) {
            draft.push_opt(field, row.get(attribute))?;
        }

        // Every value parsed; only now is a number reserved
        let jersey = ctx
            .allocator
            .allocate(ctx.state, &team_key, self.code, requested)?;
        draft.finish(jersey)
    }
}
