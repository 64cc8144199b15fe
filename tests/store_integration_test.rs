//! Store-level integration tests against the in-memory SQLite backend.
//!
//! Covers the schema's contract: composite uniqueness keys, the
//! model-version identity of predictions, cascade-versus-detach delete
//! behavior, the statement triad, and the append-only run log.

#![cfg(feature = "sqlite")]

mod common;

use common::*;
use quantledger::domain::calendar::ExchangeHoliday;
use quantledger::domain::company::NewCompany;
use quantledger::domain::corporate_action::{ActionType, CorporateAction};
use quantledger::domain::error::QuantledgerError;
use quantledger::domain::etl_run::{EtlRun, RunStatus};
use quantledger::domain::event::Event;
use quantledger::domain::feature::DailyFeature;
use quantledger::domain::fundamentals::{BalanceSheet, CashflowStatement, IncomeStatement};
use quantledger::domain::model::{
    BacktestRun, CovarianceSnapshot, ModelPrediction, ModelVersion, OptimizedPortfolio,
};
use quantledger::ports::store_port::StorePort;

mod company_identity {
    use super::*;

    #[test]
    fn symbol_exchange_pair_is_unique() {
        let store = store();
        seed_company(&store, "RELIANCE", "NSE");
        let err = store
            .insert_company(&NewCompany::new("RELIANCE", "NSE"))
            .unwrap_err();
        assert!(matches!(
            err,
            QuantledgerError::ConstraintViolation { ref table, .. } if table == "companies"
        ));
        // same symbol is fine on another exchange
        store
            .insert_company(&NewCompany::new("RELIANCE", "BSE"))
            .unwrap();
    }

    #[test]
    fn isin_unique_only_when_present() {
        let store = store();
        store
            .insert_company(&NewCompany::new("A", "NSE").with_isin("INE0A1"))
            .unwrap();
        assert!(store
            .insert_company(&NewCompany::new("B", "NSE").with_isin("INE0A1"))
            .is_err());
        // NULL isin rows do not collide
        store.insert_company(&NewCompany::new("C", "NSE")).unwrap();
        store.insert_company(&NewCompany::new("D", "NSE")).unwrap();
    }
}

mod price_history {
    use super::*;

    #[test]
    fn one_bar_per_company_date() {
        let store = store();
        let id = seed_company(&store, "TCS", "NSE");
        store.insert_prices(&[bar(id, date(2024, 2, 1), 100.0)]).unwrap();
        let err = store
            .insert_prices(&[bar(id, date(2024, 2, 1), 101.0)])
            .unwrap_err();
        assert!(matches!(
            err,
            QuantledgerError::ConstraintViolation { ref table, .. } if table == "price_history"
        ));
    }

    #[test]
    fn same_date_different_company_is_fine() {
        let store = store();
        let a = seed_company(&store, "TCS", "NSE");
        let b = seed_company(&store, "INFY", "NSE");
        store.insert_prices(&[bar(a, date(2024, 2, 1), 100.0)]).unwrap();
        store.insert_prices(&[bar(b, date(2024, 2, 1), 50.0)]).unwrap();
    }

    #[test]
    fn failed_batch_rolls_back_whole_transaction() {
        let store = store();
        let id = seed_company(&store, "TCS", "NSE");
        store.insert_prices(&[bar(id, date(2024, 2, 2), 100.0)]).unwrap();
        // second row collides, so the first row of this batch must not land
        let batch = vec![bar(id, date(2024, 2, 3), 101.0), bar(id, date(2024, 2, 2), 99.0)];
        assert!(store.insert_prices(&batch).is_err());
        assert_eq!(store.existing_trade_dates(id).unwrap(), vec![date(2024, 2, 2)]);
    }

    #[test]
    fn fetch_respects_date_window() {
        let store = store();
        let id = seed_company(&store, "TCS", "NSE");
        store.insert_prices(&bars(id, date(2024, 2, 1), 10, 100.0)).unwrap();
        let window = store
            .fetch_prices(id, date(2024, 2, 3), date(2024, 2, 5))
            .unwrap();
        assert_eq!(window.len(), 3);
        assert_eq!(window[0].trade_date, date(2024, 2, 3));
        assert_eq!(window[2].trade_date, date(2024, 2, 5));
    }
}

mod prediction_identity {
    use super::*;

    fn prediction(company_id: i64, version: &str) -> ModelPrediction {
        ModelPrediction {
            company_id,
            prediction_date: date(2024, 3, 1),
            predicted_return: Some(0.012),
            model_version: version.to_string(),
        }
    }

    #[test]
    fn model_version_is_part_of_the_key() {
        let store = store();
        let id = seed_company(&store, "INFY", "NSE");
        store.insert_prediction(&prediction(id, "xgb-v1")).unwrap();
        // second model output for the same company-date coexists
        store.insert_prediction(&prediction(id, "lstm-v2")).unwrap();
        let got = store.predictions_on(id, date(2024, 3, 1)).unwrap();
        assert_eq!(got.len(), 2);

        let err = store.insert_prediction(&prediction(id, "xgb-v1")).unwrap_err();
        assert!(matches!(err, QuantledgerError::ConstraintViolation { .. }));
    }

    #[test]
    fn predictions_may_precede_model_registration() {
        let store = store();
        let id = seed_company(&store, "INFY", "NSE");
        store.insert_prediction(&prediction(id, "xgb-v9")).unwrap();
        assert!(store.find_model_version("xgb-v9").unwrap().is_none());

        store
            .insert_model_version(&ModelVersion {
                version: "xgb-v9".to_string(),
                model_type: "gbdt".to_string(),
                train_start: Some(date(2019, 1, 1)),
                train_end: Some(date(2023, 12, 31)),
                hyperparams_json: Some(r#"{"max_depth":6}"#.to_string()),
                notes: None,
            })
            .unwrap();
        let found = store.find_model_version("xgb-v9").unwrap().unwrap();
        assert_eq!(found.model_type, "gbdt");
    }

    #[test]
    fn version_string_is_unique() {
        let store = store();
        let v = ModelVersion {
            version: "xgb-v1".to_string(),
            model_type: "gbdt".to_string(),
            train_start: None,
            train_end: None,
            hyperparams_json: None,
            notes: None,
        };
        store.insert_model_version(&v).unwrap();
        assert!(store.insert_model_version(&v).is_err());
    }
}

mod delete_semantics {
    use super::*;

    #[test]
    fn delete_cascades_to_facts_but_detaches_events() {
        let store = store();
        let id = seed_company(&store, "WIPRO", "NSE");
        store.insert_prices(&bars(id, date(2024, 1, 1), 5, 100.0)).unwrap();
        store
            .insert_corporate_action(&CorporateAction {
                company_id: id,
                action_type: ActionType::Dividend,
                action_date: date(2024, 1, 3),
                value: Some(1.0),
                ratio_from: None,
                ratio_to: None,
            })
            .unwrap();
        store
            .insert_feature(&DailyFeature::new(id, date(2024, 1, 3)))
            .unwrap();
        store
            .insert_prediction(&ModelPrediction {
                company_id: id,
                prediction_date: date(2024, 1, 4),
                predicted_return: Some(0.01),
                model_version: "m1".to_string(),
            })
            .unwrap();
        store
            .insert_balance_sheet(&BalanceSheet {
                company_id: id,
                fiscal_year: 2024,
                fiscal_quarter: 1,
                report_date: date(2024, 3, 31),
                total_assets: Some(1_000_000.0),
                ..Default::default()
            })
            .unwrap();
        store
            .insert_event(
                &Event::new(date(2024, 1, 4))
                    .for_company(id)
                    .with_headline("Q3 results above estimates")
                    .with_sentiment(0.7),
            )
            .unwrap();

        assert!(store.company_fact_counts(id).unwrap().total() > 0);

        store.delete_company(id).unwrap();

        assert_eq!(store.company_fact_counts(id).unwrap().total(), 0);
        assert!(store.find_company("WIPRO", "NSE").unwrap().is_none());

        // the event row survives with company_id nulled
        assert!(store.events_for_company(id).unwrap().is_empty());
        let surviving = store.events_on(date(2024, 1, 4)).unwrap();
        assert_eq!(surviving.len(), 1);
        assert_eq!(surviving[0].company_id, None);
        assert_eq!(
            surviving[0].headline.as_deref(),
            Some("Q3 results above estimates")
        );
    }

    #[test]
    fn delete_leaves_other_companies_untouched() {
        let store = store();
        let a = seed_company(&store, "A", "NSE");
        let b = seed_company(&store, "B", "NSE");
        store.insert_prices(&bars(a, date(2024, 1, 1), 3, 10.0)).unwrap();
        store.insert_prices(&bars(b, date(2024, 1, 1), 3, 20.0)).unwrap();

        store.delete_company(a).unwrap();
        assert_eq!(store.company_fact_counts(b).unwrap().prices, 3);
    }
}

mod statement_triad {
    use super::*;

    #[test]
    fn each_table_is_independently_unique_per_period() {
        let store = store();
        let id = seed_company(&store, "HDFC", "NSE");
        let report = date(2024, 6, 30);

        let bs = BalanceSheet {
            company_id: id,
            fiscal_year: 2024,
            fiscal_quarter: 1,
            report_date: report,
            total_assets: Some(5e9),
            ..Default::default()
        };
        let is = IncomeStatement {
            company_id: id,
            fiscal_year: 2024,
            fiscal_quarter: 1,
            report_date: report,
            revenue: Some(1e9),
            ..Default::default()
        };
        let cf = CashflowStatement {
            company_id: id,
            fiscal_year: 2024,
            fiscal_quarter: 1,
            report_date: report,
            operating_cash_flow: Some(2e8),
            ..Default::default()
        };

        // one row per table for the same period is the designed shape
        store.insert_balance_sheet(&bs).unwrap();
        store.insert_income_statement(&is).unwrap();
        store.insert_cashflow_statement(&cf).unwrap();

        assert!(store.insert_balance_sheet(&bs).is_err());
        assert!(store.insert_income_statement(&is).is_err());
        assert!(store.insert_cashflow_statement(&cf).is_err());

        // next quarter is a fresh key
        let mut q2 = bs.clone();
        q2.fiscal_quarter = 2;
        q2.report_date = date(2024, 9, 30);
        store.insert_balance_sheet(&q2).unwrap();
    }

    #[test]
    fn ratios_recompute_in_place() {
        let store = store();
        let id = seed_company(&store, "HDFC", "NSE");
        let mut ratios = quantledger::domain::fundamentals::FinancialRatios {
            company_id: id,
            fiscal_year: 2024,
            fiscal_quarter: 1,
            report_date: date(2024, 6, 30),
            roe: Some(0.171),
            ..Default::default()
        };
        store.replace_ratios(&ratios).unwrap();
        ratios.roe = Some(0.182);
        store.replace_ratios(&ratios).unwrap();
        assert_eq!(store.company_fact_counts(id).unwrap().ratios, 1);
    }
}

mod snapshots_and_runs {
    use super::*;

    #[test]
    fn one_covariance_snapshot_per_date() {
        let store = store();
        let snap = CovarianceSnapshot::from_matrix(
            date(2024, 4, 1),
            &[vec![1.0, 0.3], vec![0.3, 1.0]],
        )
        .unwrap();
        store.insert_covariance(&snap).unwrap();
        assert!(store.insert_covariance(&snap).is_err());

        let loaded = store.covariance_on(date(2024, 4, 1)).unwrap().unwrap();
        assert_eq!(loaded.num_assets, 2);
        assert_eq!(loaded.matrix().unwrap()[1][0], 0.3);
    }

    #[test]
    fn portfolio_keyed_by_date_and_version() {
        let store = store();
        let portfolio = OptimizedPortfolio {
            portfolio_date: date(2024, 4, 1),
            weights_json: r#"[{"symbol":"TCS","weight":1.0}]"#.to_string(),
            objective_value: Some(0.93),
            model_version: "markowitz-v2".to_string(),
        };
        store.insert_portfolio(&portfolio).unwrap();
        assert!(store.insert_portfolio(&portfolio).is_err());

        let mut other_model = portfolio.clone();
        other_model.model_version = "markowitz-v3".to_string();
        store.insert_portfolio(&other_model).unwrap();

        let loaded = store
            .portfolio_on(date(2024, 4, 1), "markowitz-v2")
            .unwrap()
            .unwrap();
        assert_eq!(loaded.weights().unwrap()[0].symbol, "TCS");
    }

    #[test]
    fn backtest_runs_may_overlap_freely() {
        let store = store();
        let run = BacktestRun {
            run_id: "bt-2024-04".to_string(),
            start_date: date(2020, 1, 1),
            end_date: date(2024, 1, 1),
            sharpe: Some(1.4),
            max_drawdown: Some(-0.22),
            total_return: Some(0.87),
            parameters_json: Some(r#"{"rebalance":"monthly"}"#.to_string()),
        };
        store.insert_backtest_run(&run).unwrap();
        store.insert_backtest_run(&run).unwrap();
        assert_eq!(store.backtest_runs("bt-2024-04").unwrap().len(), 2);
    }

    #[test]
    fn run_log_is_append_only_and_ordered() {
        let store = store();
        store
            .log_run(&EtlRun::new("import_prices:TCS.NSE", RunStatus::Success).with_rows(250))
            .unwrap();
        store
            .log_run(
                &EtlRun::new("import_prices:INFY.NSE", RunStatus::Failed)
                    .with_error("file not found"),
            )
            .unwrap();
        store
            .log_run(&EtlRun::new("import_prices:TCS.NSE", RunStatus::Partial).with_rows(10))
            .unwrap();

        let runs = store.list_runs(10).unwrap();
        assert_eq!(runs.len(), 3);
        // most recent first
        assert_eq!(runs[0].status, RunStatus::Partial);
        assert_eq!(runs[1].status, RunStatus::Failed);
        assert_eq!(runs[1].error_message.as_deref(), Some("file not found"));
        assert_eq!(runs[2].status, RunStatus::Success);

        assert_eq!(store.list_runs(2).unwrap().len(), 2);
    }
}

mod holidays {
    use super::*;

    #[test]
    fn holiday_unique_per_exchange_date() {
        let store = store();
        let holiday =
            ExchangeHoliday::new("NSE", date(2024, 10, 2)).with_description("Gandhi Jayanti");
        store.insert_holiday(&holiday).unwrap();
        assert!(store.insert_holiday(&holiday).is_err());
        // same date on another exchange is distinct reference data
        store
            .insert_holiday(&ExchangeHoliday::new("BSE", date(2024, 10, 2)))
            .unwrap();

        let nse = store.list_holidays("NSE").unwrap();
        assert_eq!(nse.len(), 1);
        assert_eq!(nse[0].description.as_deref(), Some("Gandhi Jayanti"));
    }
}
