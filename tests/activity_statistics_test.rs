mod common;

use activity_pricing::{
    entities::ActivityType,
    queries::activity_statistics_queries::{ActivitySummary, StatisticsOptions},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use common::{ts, TestContext};

async fn seed_unloading(
    ctx: &TestContext,
    quantity: Decimal,
    line_total: Decimal,
    day: u32,
) -> String {
    ctx.seed_instance(
        "cust-1",
        "order-1",
        "Unloading",
        Some("U1"),
        "hour",
        ActivityType::ContainerUnloading,
        quantity,
        dec!(10),
        line_total,
        ts(2024, 3, day),
    )
    .await
}

async fn seeded() -> TestContext {
    let ctx = TestContext::new().await;
    ctx.seed_order("order-1", "cust-1").await;
    seed_unloading(&ctx, dec!(2), dec!(20), 5).await;
    seed_unloading(&ctx, dec!(3), dec!(30), 10).await;
    ctx.seed_instance(
        "cust-1",
        "order-1",
        "Wrapping",
        Some("W1"),
        "pallet",
        ActivityType::Wrapping,
        dec!(4),
        dec!(2.5),
        dec!(10),
        ts(2024, 3, 7),
    )
    .await;
    ctx
}

#[tokio::test]
async fn groups_by_name_unit_code_and_type() {
    let ctx = seeded().await;

    let stats = ctx
        .activities
        .get_activity_statistics("cust-1", StatisticsOptions::default())
        .await
        .unwrap();

    assert_eq!(stats.len(), 2);
    assert_eq!(
        stats[0].activity,
        ActivitySummary {
            name: "Unloading".into(),
            code: Some("U1".into()),
            unit: "hour".into(),
            activity_type: ActivityType::ContainerUnloading,
        }
    );
    assert_eq!(stats[0].total_quantity, dec!(5));
    assert_eq!(stats[0].total_value, dec!(50));
    assert_eq!(stats[0].instance_count, 2);

    assert_eq!(stats[1].activity.name, "Wrapping");
    assert_eq!(stats[1].total_quantity, dec!(4));
    assert_eq!(stats[1].instance_count, 1);
}

#[tokio::test]
async fn same_name_with_other_unit_is_a_separate_group() {
    let ctx = seeded().await;
    ctx.seed_instance(
        "cust-1",
        "order-1",
        "Unloading",
        Some("U1"),
        "container",
        ActivityType::ContainerUnloading,
        dec!(1),
        dec!(300),
        dec!(300),
        ts(2024, 3, 6),
    )
    .await;

    let stats = ctx
        .activities
        .get_activity_statistics("cust-1", StatisticsOptions::default())
        .await
        .unwrap();

    let units: Vec<_> = stats.iter().map(|s| s.activity.unit.as_str()).collect();
    assert_eq!(units, vec!["container", "hour", "pallet"]);
}

#[tokio::test]
async fn start_date_is_an_inclusive_lower_bound() {
    let ctx = seeded().await;

    let stats = ctx
        .activities
        .get_activity_statistics(
            "cust-1",
            StatisticsOptions {
                start_date: Some(ts(2024, 3, 7)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // The unloading row from 5 March is excluded; the wrapping row created
    // exactly on 7 March is kept.
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].activity.name, "Unloading");
    assert_eq!(stats[0].total_quantity, dec!(3));
    assert_eq!(stats[0].instance_count, 1);
    assert_eq!(stats[1].activity.name, "Wrapping");
}

#[tokio::test]
async fn end_date_is_an_inclusive_upper_bound() {
    let ctx = seeded().await;

    let stats = ctx
        .activities
        .get_activity_statistics(
            "cust-1",
            StatisticsOptions {
                start_date: Some(ts(2024, 3, 5)),
                end_date: Some(ts(2024, 3, 7)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].total_value, dec!(20));
    assert_eq!(stats[1].total_value, dec!(10));
}

#[tokio::test]
async fn definition_filter_matches_instances_by_name() {
    let ctx = seeded().await;
    let unloading = ctx.seed_definition("cust-1", "Unloading", "hour").await;

    let stats = ctx
        .activities
        .get_activity_statistics(
            "cust-1",
            StatisticsOptions {
                activity_definition_ids: Some(vec![unloading]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].activity.name, "Unloading");
    assert_eq!(stats[0].total_value, dec!(50));
}

#[tokio::test]
async fn unresolvable_definition_filter_yields_nothing() {
    let ctx = seeded().await;
    let foreign = ctx.seed_definition("cust-2", "Unloading", "hour").await;

    for ids in [vec!["missing".to_string()], vec![foreign]] {
        let stats = ctx
            .activities
            .get_activity_statistics(
                "cust-1",
                StatisticsOptions {
                    activity_definition_ids: Some(ids),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(stats.is_empty());
    }
}

#[tokio::test]
async fn inactive_instances_and_definitions_are_ignored() {
    let ctx = seeded().await;
    ctx.seed_definition("cust-1", "Unloading", "hour").await;
    let extra = seed_unloading(&ctx, dec!(100), dec!(1000), 8).await;
    ctx.activities
        .deactivate_activity_instance(&extra, "cust-1")
        .await
        .unwrap();

    let stats = ctx
        .activities
        .get_activity_statistics("cust-1", StatisticsOptions::default())
        .await
        .unwrap();

    assert_eq!(stats[0].total_quantity, dec!(5));
    assert_eq!(stats[0].instance_count, 2);
}

#[tokio::test]
async fn customer_without_instances_gets_empty_list() {
    let ctx = seeded().await;

    let stats = ctx
        .activities
        .get_activity_statistics("cust-9", StatisticsOptions::default())
        .await
        .unwrap();

    assert!(stats.is_empty());
}

#[tokio::test]
async fn empty_definition_filter_is_no_filter() {
    let ctx = seeded().await;

    let unfiltered = ctx
        .activities
        .get_activity_statistics("cust-1", StatisticsOptions::default())
        .await
        .unwrap();
    let empty = ctx
        .activities
        .get_activity_statistics(
            "cust-1",
            StatisticsOptions {
                activity_definition_ids: Some(Vec::new()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(empty.len(), 2);
    assert_eq!(empty, unfiltered);
}

#[tokio::test]
async fn instances_without_code_share_one_group() {
    let ctx = TestContext::new().await;
    ctx.seed_order("order-1", "cust-1").await;
    for (quantity, line_total, day) in [(dec!(1.5), dec!(12.5), 1), (dec!(0.5), dec!(0.25), 2)] {
        ctx.seed_instance(
            "cust-1",
            "order-1",
            "Labeling",
            None,
            "piece",
            ActivityType::Labeling,
            quantity,
            dec!(1),
            line_total,
            ts(2024, 4, day),
        )
        .await;
    }

    let stats = ctx
        .activities
        .get_activity_statistics("cust-1", StatisticsOptions::default())
        .await
        .unwrap();

    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].activity.code, None);
    assert_eq!(stats[0].instance_count, 2);
    assert_eq!(stats[0].total_quantity, dec!(2));
    assert_eq!(stats[0].total_value, dec!(12.75));
}
