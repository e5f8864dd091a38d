//! Per-participant shares of one expense.
//!
//! These functions do not assume [`Expense::create`] ran: historical
//! documents may hold single-participant splits, which are charged the whole
//! amount.
//!
//! [`Expense::create`]: crate::Expense::create

use serde::Serialize;

use crate::{EngineError, Expense, MoneyCents, ParticipantId, ResultEngine};

/// Amount charged to one participant for one expense.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Share {
    pub participant: ParticipantId,
    pub amount: MoneyCents,
}

/// The per-person figure shown next to an expense (rounded to the cent).
pub fn amount_per_person(expense: &Expense) -> ResultEngine<MoneyCents> {
    ensure_split(expense)?;
    Ok(expense.total_amount.div_rounded(expense.participant_count())?)
}

/// Exact allocation of `total_amount` over `split_between`, in split order.
///
/// The shares add up to the total. When the total does not divide evenly, the
/// leftover cents go one each to the first participants of the split.
pub fn shares(expense: &Expense) -> ResultEngine<Vec<Share>> {
    ensure_split(expense)?;
    let amounts = expense.total_amount.allocate(expense.participant_count())?;
    Ok(expense
        .split_between
        .iter()
        .cloned()
        .zip(amounts)
        .map(|(participant, amount)| Share {
            participant,
            amount,
        })
        .collect())
}

fn ensure_split(expense: &Expense) -> ResultEngine<()> {
    if expense.split_between.is_empty() {
        return Err(EngineError::InvalidExpense(format!(
            "expense {} is not split between anybody",
            expense.id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn expense(total_cents: i64, split: &[&str]) -> Expense {
        Expense {
            id: "exp".to_string(),
            description: "Dinner".to_string(),
            total_amount: MoneyCents::new(total_cents),
            paid_by: "a".into(),
            date: Utc::now(),
            split_between: split.iter().map(|id| ParticipantId::from(*id)).collect(),
            category: None,
        }
    }

    #[test]
    fn even_split() {
        let shares = shares(&expense(100_00, &["a", "b"])).unwrap();
        assert_eq!(shares[0].amount, MoneyCents::new(50_00));
        assert_eq!(shares[1].amount, MoneyCents::new(50_00));
    }

    #[test]
    fn uneven_split_gives_leftover_to_first() {
        let shares = shares(&expense(100_00, &["a", "b", "c"])).unwrap();
        let amounts: Vec<i64> = shares.iter().map(|s| s.amount.cents()).collect();
        assert_eq!(amounts, vec![33_34, 33_33, 33_33]);
        assert_eq!(shares[0].participant, ParticipantId::from("a"));
        assert_eq!(
            shares.iter().map(|s| s.amount).sum::<MoneyCents>(),
            MoneyCents::new(100_00)
        );
    }

    #[test]
    fn single_participant_pays_everything() {
        let exp = expense(45_00, &["b"]);
        assert_eq!(amount_per_person(&exp).unwrap(), MoneyCents::new(45_00));
        let shares = shares(&exp).unwrap();
        assert_eq!(shares.len(), 1);
        assert_eq!(shares[0].amount, MoneyCents::new(45_00));
    }

    #[test]
    fn shares_are_positive_once_everybody_gets_a_cent() {
        for total in [3_i64, 4, 10, 100_00] {
            for n in 2..=3usize {
                let exp = expense(total, &["a", "b", "c"][..n]);
                assert!(shares(&exp).unwrap().iter().all(|s| s.amount.is_positive()));
                assert!(amount_per_person(&exp).unwrap().is_positive());
            }
        }
    }

    #[test]
    fn totals_below_one_cent_each_leave_some_shares_at_zero() {
        let exp = expense(1, &["a", "b", "c"]);
        let amounts: Vec<_> = shares(&exp).unwrap().into_iter().map(|s| s.amount).collect();
        assert_eq!(
            amounts,
            [MoneyCents::new(1), MoneyCents::ZERO, MoneyCents::ZERO]
        );
        assert_eq!(amount_per_person(&exp).unwrap(), MoneyCents::ZERO);

        let exp = expense(2, &["a", "b", "c"]);
        let amounts: Vec<_> = shares(&exp).unwrap().into_iter().map(|s| s.amount).collect();
        assert_eq!(amounts, [MoneyCents::new(1), MoneyCents::new(1), MoneyCents::ZERO]);
        assert_eq!(amount_per_person(&exp).unwrap(), MoneyCents::new(1));
    }

    #[test]
    fn share_bounds_hold_for_many_totals() {
        for total in [2_i64, 99, 100_00, 300_00, 12_345, 1_000_001] {
            for n in 1..=9usize {
                let names: Vec<String> = (0..n).map(|i| format!("p{i}")).collect();
                let refs: Vec<&str> = names.iter().map(String::as_str).collect();
                let exp = expense(total, &refs);

                let per_person = amount_per_person(&exp).unwrap();
                assert!(per_person <= exp.total_amount);

                let shares = shares(&exp).unwrap();
                let sum: MoneyCents = shares.iter().map(|s| s.amount).sum();
                assert_eq!(sum, exp.total_amount);
                let floor = total / n as i64;
                for share in &shares {
                    let cents = share.amount.cents();
                    assert!(cents == floor || cents == floor + 1);
                    assert!(cents <= total);
                    // n × share stays within n - 1 cents of the total.
                    assert!((cents * n as i64 - total).abs() < n as i64);
                }
            }
        }
    }

    #[test]
    fn empty_split_is_rejected() {
        let err = shares(&expense(10_00, &[])).unwrap_err();
        assert!(matches!(err, EngineError::InvalidExpense(_)));
        assert!(amount_per_person(&expense(10_00, &[])).is_err());
    }
}
