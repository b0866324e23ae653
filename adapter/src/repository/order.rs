use crate::database::{
    append_audit_log,
    model::{
        order::{OrderItemRow, OrderRow, OrderStateRow},
        slot::ReservedSlotRow,
    },
    ConnectionPool,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use derive_new::new;
use kernel::model::audit::{Actor, AuditAction, NewAuditLog};
use kernel::model::id::{CouponId, OrderId, OrderItemId, SlotId};
use kernel::model::order::{
    event::{CancelOrder, CreateHold, HoldCreated, MarkPaid, StartCheckout},
    Order, OrderStatus, PaymentMethod,
};
use kernel::model::slot::{ReservedSlot, SlotStatus};
use kernel::repository::order::OrderRepository;
use shared::error::{AppError, AppResult};
use std::collections::HashMap;
use uuid::Uuid;

// SERIALIZABLE 分離で直列化失敗（SQLSTATE 40001）になった場合の再試行回数。
// 使い切っても確保できなければ呼び出し側には SlotConflict として返す
const MAX_HOLD_RETRIES: usize = 3;

#[derive(new)]
pub struct OrderRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl OrderRepository for OrderRepositoryImpl {
    // ホールド作成操作を行う
    async fn create_hold(&self, event: CreateHold, now: DateTime<Utc>) -> AppResult<HoldCreated> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_create_hold(&event, now).await {
                Err(err) if is_serialization_failure(&err) => {
                    if attempt >= MAX_HOLD_RETRIES {
                        return Err(slot_conflict());
                    }
                    tracing::debug!(attempt, "hold transaction serialization failure, retrying");
                }
                other => return other,
            }
        }
    }

    // 決済セッションを紐付けて PENDING_PAYMENT へ進める
    async fn start_checkout(&self, event: StartCheckout) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        self.set_transaction_serializable(&mut tx).await?;

        let state = self.fetch_state_for_update(&mut tx, event.order_id).await?;

        if !state.status.can_transition_to(OrderStatus::PendingPayment) {
            return Err(AppError::StaleTransition(format!(
                "注文（{}）は {} のため決済を開始できません",
                event.order_id,
                state.status.as_ref()
            )));
        }

        let res = sqlx::query(
            r#"
                UPDATE orders
                SET status = 'PENDING_PAYMENT',
                    payment_session_id = $2,
                    updated_at = NOW()
                WHERE order_id = $1
            "#,
        )
        .bind(event.order_id)
        .bind(&event.payment_session_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No order record has been updated".into(),
            ));
        }

        append_audit_log(
            &mut tx,
            NewAuditLog {
                action: AuditAction::CheckoutStarted,
                entity_type: "order".into(),
                entity_id: event.order_id.to_string(),
                before: Some(status_snapshot(state.status)),
                after: Some(serde_json::json!({
                    "status": OrderStatus::PendingPayment.as_ref(),
                    "paymentSessionId": event.payment_session_id,
                })),
                actor: event.actor.to_string(),
                reason: None,
            },
        )
        .await?;

        tx.commit().await.map_err(AppError::TransactionError)?;
        Ok(())
    }

    // 決済確定操作を行う
    async fn mark_paid(&self, event: MarkPaid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        self.set_transaction_serializable(&mut tx).await?;

        let state = self.fetch_state_for_update(&mut tx, event.order_id).await?;

        // 同じ終端状態の再適用は no-op の成功として扱う
        if state.status == OrderStatus::Paid {
            return Ok(());
        }
        // 放棄済みホールドへ遅れて届いた決済確認はここで拒否する
        if !state.status.can_transition_to(OrderStatus::Paid) {
            return Err(AppError::StaleTransition(format!(
                "注文（{}）は {} のため決済確定できません",
                event.order_id,
                state.status.as_ref()
            )));
        }
        // スイーパーがまだ EXPIRED にしていなくても、期限の切れたホールドは
        // 論理的には放棄済み。枠が他者に再確保されている可能性があるため確定させない
        if state.status.sweep_eligible() {
            if let Some(expires) = state.hold_expires_at {
                if expires < event.paid_at {
                    return Err(AppError::StaleTransition(format!(
                        "注文（{}）のホールド期限が切れています",
                        event.order_id
                    )));
                }
            }
        }

        // 所有するスロットを HOLD から BOOKED へ切り替える
        sqlx::query(
            r#"
                UPDATE reserved_slots
                SET status = 'BOOKED',
                    expires_at = NULL,
                    updated_at = NOW()
                WHERE order_id = $1 AND status = 'HOLD'
            "#,
        )
        .bind(event.order_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        let res = sqlx::query(
            r#"
                UPDATE orders
                SET status = 'PAID',
                    paid_at = $2,
                    hold_expires_at = NULL,
                    updated_at = NOW()
                WHERE order_id = $1
            "#,
        )
        .bind(event.order_id)
        .bind(event.paid_at)
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No order record has been updated".into(),
            ));
        }

        // クーポンの償還はこの時点で初めて記録する（検証時には記録しない）
        if let Some(code) = &state.coupon_code {
            self.record_coupon_redemption(&mut tx, code, event.order_id, &state.customer_email)
                .await?;
        }

        append_audit_log(
            &mut tx,
            NewAuditLog {
                action: AuditAction::Paid,
                entity_type: "order".into(),
                entity_id: event.order_id.to_string(),
                before: Some(status_snapshot(state.status)),
                after: Some(serde_json::json!({
                    "status": OrderStatus::Paid.as_ref(),
                    "paidAt": event.paid_at,
                })),
                actor: event.actor.to_string(),
                reason: None,
            },
        )
        .await?;

        tx.commit().await.map_err(AppError::TransactionError)?;
        Ok(())
    }

    // キャンセル操作を行う。決済済みの注文（返金フロー）では
    // BOOKED のスロットも解放対象になる
    async fn cancel(&self, event: CancelOrder) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        self.set_transaction_serializable(&mut tx).await?;

        let state = self.fetch_state_for_update(&mut tx, event.order_id).await?;

        if state.status == OrderStatus::Cancelled {
            return Ok(());
        }
        if !state.status.can_transition_to(OrderStatus::Cancelled) {
            return Err(AppError::StaleTransition(format!(
                "注文（{}）は {} のためキャンセルできません",
                event.order_id,
                state.status.as_ref()
            )));
        }

        sqlx::query(
            r#"
                UPDATE reserved_slots
                SET status = 'RELEASED',
                    expires_at = NULL,
                    updated_at = NOW()
                WHERE order_id = $1 AND status IN ('HOLD', 'BOOKED')
            "#,
        )
        .bind(event.order_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        let res = sqlx::query(
            r#"
                UPDATE orders
                SET status = 'CANCELLED',
                    cancelled_at = $2,
                    hold_expires_at = NULL,
                    updated_at = NOW()
                WHERE order_id = $1
            "#,
        )
        .bind(event.order_id)
        .bind(event.cancelled_at)
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No order record has been updated".into(),
            ));
        }

        sqlx::query(
            r#"
                INSERT INTO cancellations (cancellation_id, order_id, reason, actor, cancelled_at)
                VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(event.order_id)
        .bind(&event.reason)
        .bind(event.actor.to_string())
        .bind(event.cancelled_at)
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        append_audit_log(
            &mut tx,
            NewAuditLog {
                action: AuditAction::Cancelled,
                entity_type: "order".into(),
                entity_id: event.order_id.to_string(),
                before: Some(status_snapshot(state.status)),
                after: Some(serde_json::json!({
                    "status": OrderStatus::Cancelled.as_ref(),
                    "cancelledAt": event.cancelled_at,
                })),
                actor: event.actor.to_string(),
                reason: Some(event.reason.clone()),
            },
        )
        .await?;

        tx.commit().await.map_err(AppError::TransactionError)?;
        Ok(())
    }

    // 期限切れホールドの掃き出し。注文ごとに独立したトランザクションで
    // 処理し、1 件の失敗が残りを巻き込まないようにする
    async fn sweep_expired_holds(&self, now: DateTime<Utc>) -> AppResult<usize> {
        let candidates: Vec<(OrderId,)> = sqlx::query_as(
            r#"
                SELECT order_id
                FROM orders
                WHERE status IN ('HOLD', 'PENDING_PAYMENT')
                  AND hold_expires_at IS NOT NULL
                  AND hold_expires_at < $1
                ORDER BY hold_expires_at ASC
            "#,
        )
        .bind(now)
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        let mut released = 0;
        for (order_id,) in candidates {
            match self.expire_order(order_id, now).await {
                Ok(true) => released += 1,
                Ok(false) => {}
                // 失敗した注文は次回のスイープで再試行される
                Err(e) => {
                    tracing::warn!(
                        error.cause_chain = ?e,
                        %order_id,
                        "failed to expire hold, will retry on next sweep"
                    );
                }
            }
        }

        Ok(released)
    }

    async fn find_by_id(&self, order_id: OrderId) -> AppResult<Order> {
        let row: Option<OrderRow> = sqlx::query_as(
            r#"
                SELECT order_id, status, payment_method, total_amount, discount_amount,
                       customer_name, customer_email, customer_phone, coupon_code,
                       hold_expires_at, paid_at, cancelled_at, payment_session_id,
                       created_by, created_at
                FROM orders
                WHERE order_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(order_id)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        let Some(row) = row else {
            return Err(AppError::EntityNotFound(format!(
                "注文（{order_id}）が見つかりませんでした。"
            )));
        };

        let items: Vec<OrderItemRow> = sqlx::query_as(
            r#"
                SELECT order_item_id, order_id, resource_id, pricing_mode, quantity,
                       people_count, unit_amount, total_amount, description
                FROM order_items
                WHERE order_id = $1
            "#,
        )
        .bind(order_id)
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        let slots: Vec<ReservedSlotRow> = sqlx::query_as(
            r#"
                SELECT slot_id, resource_id, order_id, start_time, end_time, status, expires_at
                FROM reserved_slots
                WHERE order_id = $1
                ORDER BY start_time ASC
            "#,
        )
        .bind(order_id)
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        Ok(row.into_order(
            items.into_iter().map(Into::into).collect(),
            slots.into_iter().map(Into::into).collect(),
        ))
    }

    async fn find_by_payment_session(&self, session_id: &str) -> AppResult<Option<OrderId>> {
        let row: Option<(OrderId,)> = sqlx::query_as(
            r#"
                SELECT order_id
                FROM orders
                WHERE payment_session_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(session_id)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        Ok(row.map(|(order_id,)| order_id))
    }

    // 注文一覧を新しい順に取得する
    async fn find_all(&self) -> AppResult<Vec<Order>> {
        let rows: Vec<OrderRow> = sqlx::query_as(
            r#"
                SELECT order_id, status, payment_method, total_amount, discount_amount,
                       customer_name, customer_email, customer_phone, coupon_code,
                       hold_expires_at, paid_at, cancelled_at, payment_session_id,
                       created_by, created_at
                FROM orders
                WHERE deleted_at IS NULL
                ORDER BY created_at DESC
            "#,
        )
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        let order_ids: Vec<Uuid> = rows.iter().map(|row| row.order_id.raw()).collect();

        let item_rows: Vec<OrderItemRow> = sqlx::query_as(
            r#"
                SELECT order_item_id, order_id, resource_id, pricing_mode, quantity,
                       people_count, unit_amount, total_amount, description
                FROM order_items
                WHERE order_id = ANY($1)
            "#,
        )
        .bind(&order_ids)
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        let slot_rows: Vec<ReservedSlotRow> = sqlx::query_as(
            r#"
                SELECT slot_id, resource_id, order_id, start_time, end_time, status, expires_at
                FROM reserved_slots
                WHERE order_id = ANY($1)
                ORDER BY start_time ASC
            "#,
        )
        .bind(&order_ids)
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        let mut items_by_order: HashMap<OrderId, Vec<_>> = HashMap::new();
        for item in item_rows {
            items_by_order
                .entry(item.order_id)
                .or_default()
                .push(item.into());
        }
        let mut slots_by_order: HashMap<OrderId, Vec<_>> = HashMap::new();
        for slot in slot_rows {
            slots_by_order
                .entry(slot.order_id)
                .or_default()
                .push(slot.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let items = items_by_order.remove(&row.order_id).unwrap_or_default();
                let slots = slots_by_order.remove(&row.order_id).unwrap_or_default();
                row.into_order(items, slots)
            })
            .collect())
    }
}

impl OrderRepositoryImpl {
    // create_hold などのトランザクションを利用するにあたり
    // トランザクション分離レベルを SERIALIZABLE にするために
    // 内部的に使うメソッド
    async fn set_transaction_serializable(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ) -> AppResult<()> {
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut **tx)
            .await
            .map_err(AppError::SpecificOperationError)?;
        Ok(())
    }

    // ホールド作成の本体。事前のチェックとして、以下を調べる。
    // - 要求されたすべての設備が存在し、稼働中か
    // - 要求されたすべての時間帯が既存の HOLD / BOOKED と重なっていないか
    //
    // 上記がすべて Yes だった場合のみ書き込みに進む。
    // 複数設備の要求は全体が単一トランザクションに入るため、
    // 片方だけ確保された中途半端な状態は残らない
    async fn try_create_hold(
        &self,
        event: &CreateHold,
        now: DateTime<Utc>,
    ) -> AppResult<HoldCreated> {
        let mut tx = self.db.begin().await?;
        self.set_transaction_serializable(&mut tx).await?;

        let requested_ids: Vec<Uuid> = event
            .items
            .iter()
            .map(|item| item.resource_id.raw())
            .collect();

        // 期限切れホールドをこの場で解放する（遅延失効の書き込み側）。
        // スキーマの排他制約は status が HOLD のままの行も塞いでしまうため、
        // スイーパーを待たずにここで片付けてから衝突チェックに進む。
        // 解放された注文自体は期限ガードとスイーパーが EXPIRED に倒す
        sqlx::query(
            r#"
                UPDATE reserved_slots
                SET status = 'RELEASED',
                    expires_at = NULL,
                    updated_at = NOW()
                WHERE resource_id = ANY($1)
                  AND status = 'HOLD'
                  AND expires_at IS NOT NULL
                  AND expires_at < $2
            "#,
        )
        .bind(&requested_ids)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        {
            //
            // ① 設備の存在確認 ＋ is_active チェック
            //
            let active_rows: Vec<(Uuid, bool)> = sqlx::query_as(
                r#"
                    SELECT resource_id, is_active
                    FROM resources
                    WHERE resource_id = ANY($1)
                "#,
            )
            .bind(&requested_ids)
            .fetch_all(&mut *tx)
            .await
            .map_err(AppError::SpecificOperationError)?;

            for item in &event.items {
                let found = active_rows
                    .iter()
                    .find(|(id, _)| *id == item.resource_id.raw());
                match found {
                    None => {
                        return Err(AppError::EntityNotFound(format!(
                            "設備（{}）が見つかりませんでした。",
                            item.resource_id
                        )))
                    }
                    Some((_, false)) => {
                        return Err(AppError::UnprocessableEntity(format!(
                            "設備（{}）は現在利用できません（is_active = false）",
                            item.resource_id
                        )))
                    }
                    Some((_, true)) => {}
                }
            }

            //
            // ② 希望時間帯が既存の確保と重なっていないか確認
            //    重複条件：
            //        existing.start < new.end AND new.start < existing.end
            //    期限切れの HOLD は妨げにならない（遅延失効）
            //
            for item in &event.items {
                let overlap: Option<(SlotId,)> = sqlx::query_as(
                    r#"
                        SELECT slot_id
                        FROM reserved_slots
                        WHERE resource_id = $1
                          AND status IN ('HOLD', 'BOOKED')
                          AND start_time < $3
                          AND $2 < end_time
                          AND (status = 'BOOKED' OR expires_at IS NULL OR expires_at > $4)
                        LIMIT 1
                    "#,
                )
                .bind(item.resource_id)
                .bind(item.start_time)
                .bind(item.end_time)
                .bind(now)
                .fetch_optional(&mut *tx)
                .await
                .map_err(AppError::SpecificOperationError)?;

                if overlap.is_some() {
                    return Err(slot_conflict());
                }
            }
        }

        // ここまでのチェックを通過すればホールドを作成する。
        // 現地決済は期限なしで直ちに PENDING_ONSITE、
        // オンライン決済は期限付きの HOLD として起票する
        let order_id = OrderId::new();
        let status = match event.payment_method {
            PaymentMethod::OnSiteCash => OrderStatus::PendingOnsite,
            PaymentMethod::Online => OrderStatus::Hold,
        };
        let hold_expires_at = match event.payment_method {
            PaymentMethod::OnSiteCash => None,
            PaymentMethod::Online => event.hold_expires_at,
        };

        let res = sqlx::query(
            r#"
                INSERT INTO orders
                (order_id, status, payment_method, total_amount, discount_amount,
                 customer_name, customer_email, customer_phone, coupon_code,
                 hold_expires_at, created_by)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(order_id)
        .bind(status)
        .bind(event.payment_method)
        .bind(event.total_amount)
        .bind(event.discount_amount)
        .bind(&event.customer.customer_name)
        .bind(&event.customer.customer_email)
        .bind(&event.customer.customer_phone)
        .bind(&event.coupon_code)
        .bind(hold_expires_at)
        .bind(event.created_by)
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No order record has been created".into(),
            ));
        }

        let mut reserved_slots = Vec::with_capacity(event.items.len());
        for item in &event.items {
            let slot_id = SlotId::new();
            sqlx::query(
                r#"
                    INSERT INTO reserved_slots
                    (slot_id, resource_id, order_id, start_time, end_time, status, expires_at)
                    VALUES ($1, $2, $3, $4, $5, 'HOLD', $6)
                "#,
            )
            .bind(slot_id)
            .bind(item.resource_id)
            .bind(order_id)
            .bind(item.start_time)
            .bind(item.end_time)
            .bind(hold_expires_at)
            .execute(&mut *tx)
            .await
            .map_err(map_exclusion_violation)?;

            sqlx::query(
                r#"
                    INSERT INTO order_items
                    (order_item_id, order_id, resource_id, pricing_mode, quantity,
                     people_count, unit_amount, total_amount, description)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(OrderItemId::new())
            .bind(order_id)
            .bind(item.resource_id)
            .bind(item.pricing_mode)
            .bind(item.quantity)
            .bind(item.people_count)
            .bind(item.unit_amount)
            .bind(item.total_amount)
            .bind(&item.description)
            .execute(&mut *tx)
            .await
            .map_err(AppError::SpecificOperationError)?;

            reserved_slots.push(ReservedSlot {
                slot_id,
                resource_id: item.resource_id,
                order_id,
                start_time: item.start_time,
                end_time: item.end_time,
                status: SlotStatus::Hold,
                expires_at: hold_expires_at,
            });
        }

        append_audit_log(
            &mut tx,
            NewAuditLog {
                action: AuditAction::HoldCreated,
                entity_type: "order".into(),
                entity_id: order_id.to_string(),
                before: None,
                after: Some(serde_json::json!({
                    "status": status.as_ref(),
                    "paymentMethod": event.payment_method.as_ref(),
                    "totalAmount": event.total_amount,
                    "discountAmount": event.discount_amount,
                    "holdExpiresAt": hold_expires_at,
                })),
                actor: event
                    .created_by
                    .map(Actor::Staff)
                    .unwrap_or(Actor::Customer)
                    .to_string(),
                reason: None,
            },
        )
        .await?;

        tx.commit().await.map_err(AppError::TransactionError)?;

        Ok(HoldCreated {
            order_id,
            hold_expires_at,
            total_amount: event.total_amount,
            discount_amount: event.discount_amount,
            reserved_slots,
            requires_online_payment: event.payment_method.requires_online_payment(),
        })
    }

    // 1 注文分の期限切れ処理。遅れて届く決済確定と競合しても、
    // トランザクション内で状態を再確認しているため取りこぼしは起きない
    async fn expire_order(&self, order_id: OrderId, now: DateTime<Utc>) -> AppResult<bool> {
        let mut tx = self.db.begin().await?;
        self.set_transaction_serializable(&mut tx).await?;

        let state = self.fetch_state_for_update(&mut tx, order_id).await?;

        // 候補の抽出後に決済やキャンセルが先に確定したケース。
        // すでに処理済みなので何もしない（冪等）
        let still_expired = state.status.sweep_eligible()
            && state.hold_expires_at.is_some_and(|expires| expires < now);
        if !still_expired {
            return Ok(false);
        }

        sqlx::query(
            r#"
                UPDATE reserved_slots
                SET status = 'RELEASED',
                    expires_at = NULL,
                    updated_at = NOW()
                WHERE order_id = $1 AND status = 'HOLD'
            "#,
        )
        .bind(order_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        let res = sqlx::query(
            r#"
                UPDATE orders
                SET status = 'EXPIRED',
                    hold_expires_at = NULL,
                    updated_at = NOW()
                WHERE order_id = $1
            "#,
        )
        .bind(order_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No order record has been updated".into(),
            ));
        }

        append_audit_log(
            &mut tx,
            NewAuditLog {
                action: AuditAction::Expired,
                entity_type: "order".into(),
                entity_id: order_id.to_string(),
                before: Some(status_snapshot(state.status)),
                after: Some(status_snapshot(OrderStatus::Expired)),
                actor: "system:expiry-sweeper".into(),
                reason: None,
            },
        )
        .await?;

        tx.commit().await.map_err(AppError::TransactionError)?;
        Ok(true)
    }

    // 状態遷移のガードに使う行を FOR UPDATE で取得する。
    // 決済確定とスイープが同じ注文を同時に触っても片方が待たされる
    async fn fetch_state_for_update(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        order_id: OrderId,
    ) -> AppResult<OrderStateRow> {
        let state: Option<OrderStateRow> = sqlx::query_as(
            r#"
                SELECT order_id, status, coupon_code, customer_email, hold_expires_at
                FROM orders
                WHERE order_id = $1 AND deleted_at IS NULL
                FOR UPDATE
            "#,
        )
        .bind(order_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        state.ok_or_else(|| {
            AppError::EntityNotFound(format!("注文（{order_id}）が見つかりませんでした。"))
        })
    }

    async fn record_coupon_redemption(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        code: &str,
        order_id: OrderId,
        email: &str,
    ) -> AppResult<()> {
        let coupon: Option<(CouponId, bool)> = sqlx::query_as(
            r#"
                SELECT coupon_id, use_per_email
                FROM coupons
                WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&mut **tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        // ホールド後にクーポン自体が消えた場合は注文を壊さず記録だけ諦める
        let Some((coupon_id, use_per_email)) = coupon else {
            tracing::warn!(%order_id, code, "coupon disappeared before redemption");
            return Ok(());
        };

        // (coupon_id, order_id) で一意。再実行しても二重記録にならない
        sqlx::query(
            r#"
                INSERT INTO coupon_redemptions (coupon_id, order_id, email, redeemed_at)
                VALUES ($1, $2, $3, NOW())
                ON CONFLICT (coupon_id, order_id) DO NOTHING
            "#,
        )
        .bind(coupon_id)
        .bind(order_id)
        .bind(email)
        .execute(&mut **tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        if !use_per_email {
            sqlx::query(
                r#"
                    UPDATE coupon_email_assignments
                    SET used_at = NOW()
                    WHERE coupon_id = $1 AND email = $2 AND used_at IS NULL
                "#,
            )
            .bind(coupon_id)
            .bind(email)
            .execute(&mut **tx)
            .await
            .map_err(AppError::SpecificOperationError)?;
        }

        Ok(())
    }
}

fn status_snapshot(status: OrderStatus) -> serde_json::Value {
    serde_json::json!({ "status": status.as_ref() })
}

fn slot_conflict() -> AppError {
    AppError::SlotConflict(
        "指定時間帯にすでに確保が存在します。空き状況を再取得して別の時間帯をお選びください。"
            .into(),
    )
}

// 直列化失敗（40001）は再試行対象
fn is_serialization_failure(err: &AppError) -> bool {
    match err {
        AppError::SpecificOperationError(sqlx::Error::Database(db))
        | AppError::TransactionError(sqlx::Error::Database(db)) => {
            db.code().as_deref() == Some("40001")
        }
        _ => false,
    }
}

// スキーマ側の排他制約（exclusion constraint）に弾かれた場合も
// 呼び出し側には同じ SlotConflict として見せる
fn map_exclusion_violation(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some("23P01") {
            return slot_conflict();
        }
    }
    AppError::SpecificOperationError(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel::model::audit::Actor;
    use kernel::model::id::ResourceId;
    use kernel::model::order::event::HoldItem;
    use kernel::model::order::{Customer, PricingMode};
    use kernel::model::resource::ResourceType;
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;

    async fn seed_lane(pool: &sqlx::PgPool) -> ResourceId {
        let resource_id = ResourceId::new();
        sqlx::query(
            r#"
                INSERT INTO resources
                (resource_id, resource_name, resource_type, capacity, is_active)
                VALUES ($1, 'レーン1', 'BOWLING_LANE', 6, TRUE)
            "#,
        )
        .bind(resource_id)
        .execute(pool)
        .await
        .unwrap();
        resource_id
    }

    fn customer() -> Customer {
        Customer {
            customer_name: "山田 太郎".into(),
            customer_email: "taro@example.com".into(),
            customer_phone: "090-0000-0000".into(),
        }
    }

    fn lane_hold(
        resource_id: ResourceId,
        start: DateTime<Utc>,
        hours: i64,
        payment_method: PaymentMethod,
        hold_expires_at: Option<DateTime<Utc>>,
    ) -> CreateHold {
        let end = start + Duration::hours(hours);
        let total = 2400 * hours;
        CreateHold {
            items: vec![HoldItem {
                resource_id,
                pricing_mode: PricingMode::PerResourcePerHour,
                start_time: start,
                end_time: end,
                quantity: 1,
                people_count: None,
                unit_amount: 2400,
                total_amount: total,
                description: "レーン1 2時間".into(),
            }],
            customer: customer(),
            coupon_code: None,
            payment_method,
            total_amount: total,
            discount_amount: 0,
            hold_expires_at,
            created_by: None,
        }
    }

    fn t(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, h, 0, 0).unwrap()
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_overlapping_hold_is_rejected(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let repo = OrderRepositoryImpl::new(ConnectionPool::new(pool));
        let lane = seed_lane(repo.db.inner_ref()).await;
        let now = t(9);

        let event = lane_hold(lane, t(14), 2, PaymentMethod::Online, Some(now + Duration::minutes(15)));
        let created = repo.create_hold(event, now).await?;
        assert!(created.requires_online_payment);
        assert_eq!(created.reserved_slots.len(), 1);

        // 一部でも重なる時間帯は拒否される
        let conflicting = lane_hold(lane, t(15), 2, PaymentMethod::Online, Some(now + Duration::minutes(15)));
        let err = repo.create_hold(conflicting, now).await.unwrap_err();
        assert!(matches!(err, AppError::SlotConflict(_)));

        // 接しているだけの時間帯は確保できる
        let adjacent = lane_hold(lane, t(16), 2, PaymentMethod::Online, Some(now + Duration::minutes(15)));
        assert!(repo.create_hold(adjacent, now).await.is_ok());

        Ok(())
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_concurrent_holds_only_one_wins(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let repo = Arc::new(OrderRepositoryImpl::new(ConnectionPool::new(pool)));
        let lane = seed_lane(repo.db.inner_ref()).await;
        let now = t(9);

        let left = {
            let repo = repo.clone();
            let event = lane_hold(lane, t(14), 2, PaymentMethod::Online, Some(now + Duration::minutes(15)));
            tokio::spawn(async move { repo.create_hold(event, now).await })
        };
        let right = {
            let repo = repo.clone();
            let event = lane_hold(lane, t(14), 2, PaymentMethod::Online, Some(now + Duration::minutes(15)));
            tokio::spawn(async move { repo.create_hold(event, now).await })
        };

        let (left, right) = (left.await?, right.await?);
        let successes = [&left, &right].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "同じ時間帯の同時要求はちょうど 1 件だけ成功する");

        let loser = if left.is_ok() { right } else { left };
        assert!(matches!(loser.unwrap_err(), AppError::SlotConflict(_)));

        Ok(())
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_onsite_hold_has_no_expiry_countdown(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let repo = OrderRepositoryImpl::new(ConnectionPool::new(pool));
        let lane = seed_lane(repo.db.inner_ref()).await;
        let now = t(9);

        // 現地決済は即 PENDING_ONSITE になり、期限は付かない
        let event = lane_hold(lane, t(14), 2, PaymentMethod::OnSiteCash, None);
        let created = repo.create_hold(event, now).await?;
        assert!(!created.requires_online_payment);
        assert!(created.hold_expires_at.is_none());

        let order = repo.find_by_id(created.order_id).await?;
        assert_eq!(order.status, OrderStatus::PendingOnsite);
        assert!(order.hold_expires_at.is_none());
        assert!(order.slots.iter().all(|s| s.expires_at.is_none()));

        // スイーパーを回しても対象にならない
        let released = repo.sweep_expired_holds(now + Duration::hours(24)).await?;
        assert_eq!(released, 0);

        // 他者からは確保済みに見える
        let other = lane_hold(lane, t(14), 2, PaymentMethod::Online, Some(now + Duration::minutes(15)));
        let err = repo.create_hold(other, now + Duration::hours(24)).await.unwrap_err();
        assert!(matches!(err, AppError::SlotConflict(_)));

        Ok(())
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_sweep_releases_expired_hold_and_is_idempotent(
        pool: sqlx::PgPool,
    ) -> anyhow::Result<()> {
        let repo = OrderRepositoryImpl::new(ConnectionPool::new(pool));
        let lane = seed_lane(repo.db.inner_ref()).await;
        let now = t(9);

        let event = lane_hold(lane, t(14), 2, PaymentMethod::Online, Some(now + Duration::minutes(15)));
        let created = repo.create_hold(event, now).await?;

        // 期限前は何も起きない
        assert_eq!(repo.sweep_expired_holds(now).await?, 0);

        // 期限が過ぎたら注文は EXPIRED、スロットは RELEASED になる
        let later = now + Duration::minutes(30);
        assert_eq!(repo.sweep_expired_holds(later).await?, 1);
        let order = repo.find_by_id(created.order_id).await?;
        assert_eq!(order.status, OrderStatus::Expired);
        assert!(order.slots.iter().all(|s| s.status == SlotStatus::Released));

        // 再実行は no-op
        assert_eq!(repo.sweep_expired_holds(later).await?, 0);

        // 解放後は同じ時間帯を再確保できる
        let again = lane_hold(lane, t(14), 2, PaymentMethod::Online, Some(later + Duration::minutes(15)));
        assert!(repo.create_hold(again, later).await.is_ok());

        Ok(())
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_expired_hold_is_free_for_others_before_sweep(
        pool: sqlx::PgPool,
    ) -> anyhow::Result<()> {
        let repo = OrderRepositoryImpl::new(ConnectionPool::new(pool));
        let lane = seed_lane(repo.db.inner_ref()).await;
        let now = t(9);

        let event = lane_hold(lane, t(14), 2, PaymentMethod::Online, Some(now + Duration::minutes(15)));
        let abandoned = repo.create_hold(event, now).await?;

        // スイーパーがまだ走っていなくても、期限切れホールドは空き扱い
        let later = now + Duration::minutes(30);
        let event = lane_hold(lane, t(14), 2, PaymentMethod::Online, Some(later + Duration::minutes(15)));
        assert!(repo.create_hold(event, later).await.is_ok());

        // 放棄された側の注文へ遅れて届いた決済確認は、スイープ前でも拒否される
        let err = repo
            .mark_paid(MarkPaid::new(
                abandoned.order_id,
                Actor::PaymentWebhook,
                later,
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StaleTransition(_)));

        Ok(())
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_mark_paid_flips_slots_and_rejects_late_confirmation(
        pool: sqlx::PgPool,
    ) -> anyhow::Result<()> {
        let repo = OrderRepositoryImpl::new(ConnectionPool::new(pool));
        let lane = seed_lane(repo.db.inner_ref()).await;
        let now = t(9);

        let event = lane_hold(lane, t(14), 2, PaymentMethod::Online, Some(now + Duration::minutes(15)));
        let created = repo.create_hold(event, now).await?;
        repo.start_checkout(StartCheckout::new(
            created.order_id,
            "sess_123".into(),
            Actor::Customer,
        ))
        .await?;

        // 期限内に届いた決済確認でスロットが BOOKED になる
        repo.mark_paid(MarkPaid::new(
            created.order_id,
            Actor::PaymentWebhook,
            now + Duration::minutes(5),
        ))
        .await?;
        let order = repo.find_by_id(created.order_id).await?;
        assert_eq!(order.status, OrderStatus::Paid);
        assert!(order.paid_at.is_some());
        assert!(order.slots.iter().all(|s| s.status == SlotStatus::Booked));

        // 同じ終端状態の再適用は成功の no-op
        assert!(repo
            .mark_paid(MarkPaid::new(created.order_id, Actor::PaymentWebhook, t(11)))
            .await
            .is_ok());

        // 期限切れで EXPIRED になった注文への遅延決済は拒否される
        let event = lane_hold(lane, t(18), 2, PaymentMethod::Online, Some(now + Duration::minutes(15)));
        let expired = repo.create_hold(event, now).await?;
        assert_eq!(repo.sweep_expired_holds(now + Duration::hours(1)).await?, 1);
        let err = repo
            .mark_paid(MarkPaid::new(expired.order_id, Actor::PaymentWebhook, t(11)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StaleTransition(_)));

        Ok(())
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_cancel_before_payment_frees_the_window(
        pool: sqlx::PgPool,
    ) -> anyhow::Result<()> {
        let repo = OrderRepositoryImpl::new(ConnectionPool::new(pool));
        let lane = seed_lane(repo.db.inner_ref()).await;
        let now = t(9);

        let event = lane_hold(lane, t(10), 2, PaymentMethod::Online, Some(now + Duration::minutes(15)));
        let created = repo.create_hold(event, now).await?;

        repo.cancel(CancelOrder::new(
            created.order_id,
            Actor::Customer,
            "予定が変わったため".into(),
            now,
        ))
        .await?;

        let order = repo.find_by_id(created.order_id).await?;
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert!(order.slots.iter().all(|s| s.status == SlotStatus::Released));

        // キャンセル後は同じ時間帯をまるごと確保し直せる
        let event = lane_hold(lane, t(10), 2, PaymentMethod::Online, Some(now + Duration::minutes(15)));
        assert!(repo.create_hold(event, now).await.is_ok());

        Ok(())
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_paid_order_can_be_cancelled_for_refund(
        pool: sqlx::PgPool,
    ) -> anyhow::Result<()> {
        let repo = OrderRepositoryImpl::new(ConnectionPool::new(pool));
        let lane = seed_lane(repo.db.inner_ref()).await;
        let staff_id = kernel::model::id::StaffId::new();
        sqlx::query(
            r#"
                INSERT INTO staff_accounts (staff_id, staff_name, email, password_hash, role)
                VALUES ($1, '店長', 'manager@example.com', 'x', 'ADMIN')
            "#,
        )
        .bind(staff_id)
        .execute(repo.db.inner_ref())
        .await?;
        let now = t(9);

        let event = lane_hold(lane, t(14), 2, PaymentMethod::OnSiteCash, None);
        let created = repo.create_hold(event, now).await?;
        repo.mark_paid(MarkPaid::new(created.order_id, Actor::Staff(staff_id), t(14)))
            .await?;

        // 返金フロー：PAID でも BOOKED スロットを解放してキャンセルできる
        repo.cancel(CancelOrder::new(
            created.order_id,
            Actor::Staff(staff_id),
            "設備故障のため返金".into(),
            t(15),
        ))
        .await?;

        let order = repo.find_by_id(created.order_id).await?;
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert!(order.slots.iter().all(|s| s.status == SlotStatus::Released));

        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM cancellations WHERE order_id = $1")
                .bind(created.order_id)
                .fetch_one(repo.db.inner_ref())
                .await?;
        assert_eq!(count, 1);

        Ok(())
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_multi_resource_hold_is_all_or_nothing(
        pool: sqlx::PgPool,
    ) -> anyhow::Result<()> {
        let repo = OrderRepositoryImpl::new(ConnectionPool::new(pool));
        let lane_a = seed_lane(repo.db.inner_ref()).await;
        let lane_b = seed_lane(repo.db.inner_ref()).await;
        let now = t(9);

        // lane_b だけ先に埋めておく
        let event = lane_hold(lane_b, t(14), 2, PaymentMethod::OnSiteCash, None);
        repo.create_hold(event, now).await?;

        // 2 レーン同時の要求は片方の衝突で全体が失敗する
        let mut event = lane_hold(lane_a, t(14), 2, PaymentMethod::Online, Some(now + Duration::minutes(15)));
        let mut second = lane_hold(lane_b, t(14), 2, PaymentMethod::Online, Some(now + Duration::minutes(15)));
        event.items.append(&mut second.items);
        event.total_amount += second.total_amount;
        let err = repo.create_hold(event, now).await.unwrap_err();
        assert!(matches!(err, AppError::SlotConflict(_)));

        // lane_a 側には何も残っていない（部分確保なし）
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM reserved_slots WHERE resource_id = $1",
        )
        .bind(lane_a)
        .fetch_one(repo.db.inner_ref())
        .await?;
        assert_eq!(count, 0);

        Ok(())
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_mark_paid_records_coupon_redemption_once(
        pool: sqlx::PgPool,
    ) -> anyhow::Result<()> {
        let repo = OrderRepositoryImpl::new(ConnectionPool::new(pool));
        let lane = seed_lane(repo.db.inner_ref()).await;
        let coupon_id = CouponId::new();
        sqlx::query(
            r#"
                INSERT INTO coupons
                (coupon_id, code, discount_type, value, applies_to_all, min_total,
                 max_uses_total, use_per_email, is_active)
                VALUES ($1, 'SAVE10', 'PERCENT', 1000, TRUE, 5000, 100, TRUE, TRUE)
            "#,
        )
        .bind(coupon_id)
        .execute(repo.db.inner_ref())
        .await?;
        let now = t(9);

        let mut event = lane_hold(lane, t(14), 3, PaymentMethod::OnSiteCash, None);
        event.coupon_code = Some("SAVE10".into());
        event.discount_amount = 720;
        event.total_amount = 7200 - 720;
        let created = repo.create_hold(event, now).await?;

        // 検証だけでは償還は記録されない
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM coupon_redemptions WHERE coupon_id = $1")
                .bind(coupon_id)
                .fetch_one(repo.db.inner_ref())
                .await?;
        assert_eq!(count, 0);

        repo.mark_paid(MarkPaid::new(created.order_id, Actor::Customer, t(14)))
            .await?;
        repo.mark_paid(MarkPaid::new(created.order_id, Actor::Customer, t(15)))
            .await?;

        // PAID 遷移で一度だけ記録される
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM coupon_redemptions WHERE coupon_id = $1")
                .bind(coupon_id)
                .fetch_one(repo.db.inner_ref())
                .await?;
        assert_eq!(count, 1);

        Ok(())
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_every_transition_leaves_an_audit_trail(
        pool: sqlx::PgPool,
    ) -> anyhow::Result<()> {
        let repo = OrderRepositoryImpl::new(ConnectionPool::new(pool));
        let lane = seed_lane(repo.db.inner_ref()).await;
        let now = t(9);

        let event = lane_hold(lane, t(14), 2, PaymentMethod::Online, Some(now + Duration::minutes(15)));
        let created = repo.create_hold(event, now).await?;
        repo.start_checkout(StartCheckout::new(
            created.order_id,
            "sess_audit".into(),
            Actor::Customer,
        ))
        .await?;
        repo.mark_paid(MarkPaid::new(
            created.order_id,
            Actor::PaymentWebhook,
            now + Duration::minutes(5),
        ))
        .await?;

        let actions: Vec<(String,)> = sqlx::query_as(
            r#"
                SELECT action FROM audit_logs
                WHERE entity_type = 'order' AND entity_id = $1
                ORDER BY created_at ASC
            "#,
        )
        .bind(created.order_id.to_string())
        .fetch_all(repo.db.inner_ref())
        .await?;

        let actions: Vec<&str> = actions.iter().map(|(a,)| a.as_str()).collect();
        assert_eq!(actions, vec!["HOLD_CREATED", "CHECKOUT_STARTED", "PAID"]);

        Ok(())
    }
}
