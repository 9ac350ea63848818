use std::collections::HashMap;
use std::time::{Duration, Instant};

use eframe::egui::{self, Color32, Pos2, Rect, Sense, Stroke, Vec2};

use crate::flow_utils::changes::{Connection, EdgeChange, NodeChange};
use crate::flow_utils::state::{FlowState, NodeId, Position};
use crate::persistence::persist::{self, BoardSnapshot};
use crate::persistence::settings::AppSettings;

// Style for toast notifications
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum NoticeStyle {
    Subtle,
    Prominent,
}

// Two-click edge drawing: pick the source node, then the target node
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ConnectPick {
    Source,
    Target { source: NodeId },
}

// Per-frame screen geometry for one node
struct NodeLayout {
    id: NodeId,
    rect: Rect,
    label: String,
    canvas_selected: bool,
    world_size: (f32, f32),
    stored_size: Option<(f32, f32)>,
}

pub struct FlowApp {
    state: FlowState,
    settings: AppSettings,

    // Edit panel target plus its uncommitted draft title
    selected: Option<NodeId>,
    draft_title: String,
    // Tooltip/highlight target; set on pointer enter, cleared on leave,
    // never persisted
    hovered: Option<NodeId>,

    connect_pick: Option<ConnectPick>,
    dragging: Option<NodeId>,
    pan: Vec2,
    zoom: f32,

    // persistence status
    save_error: Option<String>,
    last_info: Option<String>,
    last_info_time: Option<Instant>,
    last_info_style: NoticeStyle,
    show_load_versions: bool,
}

impl FlowApp {
    pub fn new(state: FlowState, settings: AppSettings) -> Self {
        FlowApp {
            state,
            settings,
            selected: None,
            draft_title: String::new(),
            hovered: None,
            connect_pick: None,
            dragging: None,
            pan: Vec2::ZERO,
            zoom: 1.0,
            save_error: None,
            last_info: None,
            last_info_time: None,
            last_info_style: NoticeStyle::Subtle,
            show_load_versions: false,
        }
    }

    fn notify(&mut self, msg: String, style: NoticeStyle) {
        self.last_info = Some(msg);
        self.last_info_time = Some(Instant::now());
        self.last_info_style = style;
    }

    // Commit hooks: one slot write per observed change to the respective
    // sequence. Failures surface in the top bar and are not retried.
    fn commit_nodes(&mut self) {
        match persist::save_nodes(&self.state.nodes) {
            Ok(_) => self.save_error = None,
            Err(e) => self.save_error = Some(format!("Save failed: {}", e)),
        }
    }

    fn commit_edges(&mut self) {
        match persist::save_edges(&self.state.edges) {
            Ok(_) => self.save_error = None,
            Err(e) => self.save_error = Some(format!("Save failed: {}", e)),
        }
    }

    // Canvas contract: incremental gesture events are applied to the state
    // verbatim, then mirrored out.
    pub fn on_nodes_change(&mut self, changes: &[NodeChange]) {
        if changes.is_empty() {
            return;
        }
        self.state.apply_node_changes(changes);
        self.commit_nodes();
    }

    pub fn on_edges_change(&mut self, changes: &[EdgeChange]) {
        if changes.is_empty() {
            return;
        }
        self.state.apply_edge_changes(changes);
        self.commit_edges();
    }

    pub fn on_connect(&mut self, conn: Connection) {
        self.state.add_edge(conn, self.settings.animate_new_edges);
        self.commit_edges();
    }

    /// Select a node: flip the canvas selection flags and seed the edit
    /// panel draft from the current label. Hover is left untouched.
    pub fn on_node_click(&mut self, id: NodeId) {
        let flips: Vec<NodeChange> = self
            .state
            .nodes
            .iter()
            .filter(|n| n.selected != (n.id == id))
            .map(|n| NodeChange::Selected { id: n.id, selected: n.id == id })
            .collect();
        self.on_nodes_change(&flips);
        if let Some(node) = self.state.node(id) {
            self.draft_title = node.label.clone();
            self.selected = Some(id);
        }
    }

    pub fn on_node_hover_enter(&mut self, id: NodeId) {
        self.hovered = Some(id);
    }

    pub fn on_node_hover_leave(&mut self) {
        self.hovered = None;
    }

    fn create_node_now(&mut self) {
        let _ = self.state.create_node(self.settings.spawn_extent);
        self.commit_nodes();
    }

    fn save_draft(&mut self) {
        if let Some(id) = self.selected {
            let title = std::mem::take(&mut self.draft_title);
            if self.state.rename_node(id, title) {
                self.commit_nodes();
            }
        }
        self.selected = None;
        self.draft_title.clear();
    }

    fn cancel_edit(&mut self) {
        self.selected = None;
        self.draft_title.clear();
    }

    fn delete_selected_subtree(&mut self) {
        if let Some(id) = self.selected {
            let removed = self.state.delete_subtree(id);
            self.commit_nodes();
            self.commit_edges();
            self.notify(format!("Deleted {} node(s)", removed), NoticeStyle::Prominent);
        }
        self.selected = None;
        self.draft_title.clear();
    }

    fn save_version_now(&mut self) {
        let snapshot = BoardSnapshot {
            nodes: self.state.nodes.clone(),
            edges: self.state.edges.clone(),
        };
        match persist::save_versioned(&snapshot) {
            Ok(path) => {
                self.save_error = None;
                self.notify(format!("Saved version {}", path.display()), NoticeStyle::Prominent);
            }
            Err(e) => self.save_error = Some(format!("Save version failed: {}", e)),
        }
    }

    fn restore_snapshot(&mut self, snapshot: BoardSnapshot, label: &str) {
        self.state = FlowState::from_parts(snapshot.nodes, snapshot.edges);
        self.cancel_edit();
        self.hovered = None;
        self.connect_pick = None;
        self.dragging = None;
        self.commit_nodes();
        self.commit_edges();
        self.notify(format!("Loaded {}", label), NoticeStyle::Prominent);
    }

    fn top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Create node").clicked() {
                    self.create_node_now();
                }
                match self.connect_pick {
                    None => {
                        if ui.button("Draw edge").clicked() {
                            self.connect_pick = Some(ConnectPick::Source);
                        }
                    }
                    Some(pick) => {
                        let hint = match pick {
                            ConnectPick::Source => "click the source node",
                            ConnectPick::Target { .. } => "click the target node",
                        };
                        ui.colored_label(Color32::from_rgb(120, 220, 255), hint);
                        if ui.button("Cancel").clicked() {
                            self.connect_pick = None;
                        }
                    }
                }
                ui.separator();
                ui.menu_button("File", |ui| {
                    if ui.button("Save Version").clicked() {
                        self.save_version_now();
                        ui.close();
                    }
                    if ui.button("Load Versions...").clicked() {
                        self.show_load_versions = true;
                        ui.close();
                    }
                });
                ui.menu_button("View", |ui| {
                    ui.add(
                        egui::Slider::new(&mut self.zoom, 0.25..=2.0)
                            .text("Zoom")
                            .clamping(egui::SliderClamping::Always),
                    );
                    if ui.button("Reset view").clicked() {
                        self.pan = Vec2::ZERO;
                        self.zoom = 1.0;
                        ui.close();
                    }
                });
                ui.menu_button("Settings", |ui| {
                    ui.add(
                        egui::Slider::new(&mut self.settings.spawn_extent, 100.0..=1000.0)
                            .text("Spawn area"),
                    );
                    ui.checkbox(&mut self.settings.animate_new_edges, "Animate new edges");
                    if ui.button("Save settings").clicked() {
                        match self.settings.save() {
                            Ok(()) => self.notify("Settings saved".into(), NoticeStyle::Subtle),
                            Err(e) => self.save_error = Some(format!("Settings save failed: {}", e)),
                        }
                        ui.close();
                    }
                });
                if let Some(err) = &self.save_error {
                    ui.colored_label(Color32::RED, err);
                }
            });
        });
    }

    fn canvas(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let available = ui.available_rect_before_wrap();
            let bg_resp = ui.allocate_rect(available, Sense::click_and_drag());
            let painter = ui.painter_at(available);

            let pan = self.pan;
            let zoom = self.zoom;
            let origin = available.min.to_vec2();
            let to_screen =
                move |p: Position| Pos2::new(p.x * zoom + pan.x, p.y * zoom + pan.y) + origin;

            // Escape backs out of an in-progress edge draw
            if ui.input(|i| i.key_pressed(egui::Key::Escape)) {
                self.connect_pick = None;
            }

            // Zoom with scroll only when pointer is over the canvas area
            if bg_resp.hovered() {
                let scroll = ui.input(|i| i.raw_scroll_delta.y);
                if scroll != 0.0 {
                    let factor = (1.0 + scroll * 0.001).clamp(0.9, 1.1);
                    self.zoom = (self.zoom * factor).clamp(0.25, 2.0);
                    ui.ctx().request_repaint_after(Duration::from_millis(16));
                }
            }

            // Per-frame node geometry: world size comes from a zoom-independent
            // layout pass so it stays stable while zooming
            let layouts: Vec<NodeLayout> = self
                .state
                .nodes
                .iter()
                .map(|node| {
                    let galley = painter.layout_no_wrap(
                        node.label.clone(),
                        egui::FontId::proportional(13.0),
                        Color32::WHITE,
                    );
                    let world_w = (galley.size().x + 24.0).max(110.0);
                    let world_h = (galley.size().y + 16.0).max(34.0);
                    let rect = Rect::from_center_size(
                        to_screen(node.position),
                        Vec2::new(world_w, world_h) * zoom,
                    );
                    NodeLayout {
                        id: node.id,
                        rect,
                        label: node.label.clone(),
                        canvas_selected: node.selected,
                        world_size: (world_w, world_h),
                        stored_size: node.size,
                    }
                })
                .collect();
            let rect_by_id: HashMap<NodeId, Rect> =
                layouts.iter().map(|l| (l.id, l.rect)).collect();

            // Determine hover before drawing, topmost node wins; then fire
            // enter/leave transitions against the tracked slot. While a node
            // is mid-drag the pointer can outrun its rect, so hover is held.
            if self.dragging.is_none() {
                let mut frame_hover: Option<NodeId> = None;
                if let Some(mouse_pos) = ui.ctx().pointer_hover_pos() {
                    if available.contains(mouse_pos) {
                        frame_hover = layouts
                            .iter()
                            .rev()
                            .find(|l| l.rect.contains(mouse_pos))
                            .map(|l| l.id);
                    }
                }
                if frame_hover != self.hovered {
                    if self.hovered.is_some() {
                        self.on_node_hover_leave();
                    }
                    if let Some(id) = frame_hover {
                        self.on_node_hover_enter(id);
                    }
                }
            }

            // Draw edges underneath the nodes
            let dash_phase = (ui.input(|i| i.time) * 40.0) as f32;
            let mut any_animated = false;
            let base_color = Color32::from_rgba_premultiplied(200, 200, 200, 200);
            for edge in &self.state.edges {
                let (Some(a_rect), Some(b_rect)) =
                    (rect_by_id.get(&edge.source), rect_by_id.get(&edge.target))
                else {
                    // Stale endpoints: nothing to draw until the next
                    // structural mutation sweeps the edge out
                    continue;
                };
                let a = a_rect.center();
                let b = b_rect.center();
                let incident_hover = self
                    .hovered
                    .map(|h| h == edge.source || h == edge.target)
                    .unwrap_or(false);
                let stroke = if incident_hover {
                    Stroke { width: 2.5, color: Color32::from_rgb(120, 220, 255) }
                } else {
                    Stroke { width: 1.5, color: base_color }
                };
                if edge.animated {
                    any_animated = true;
                    draw_dashed_line(&painter, a, b, stroke, 8.0 * zoom, 6.0 * zoom, dash_phase);
                } else {
                    painter.line_segment([a, b], stroke);
                }
            }
            if any_animated {
                ui.ctx().request_repaint_after(Duration::from_millis(50));
            }

            // Provisional line while a new edge is being drawn
            if let Some(ConnectPick::Target { source }) = self.connect_pick {
                if let (Some(rect), Some(mouse_pos)) =
                    (rect_by_id.get(&source), ui.ctx().pointer_hover_pos())
                {
                    let stroke = Stroke { width: 1.5, color: Color32::from_rgb(120, 220, 255) };
                    draw_dashed_line(&painter, rect.center(), mouse_pos, stroke, 6.0, 5.0, 0.0);
                }
            }

            // Draw nodes and collect gesture events; mutations are dispatched
            // after the loop
            let mut moved: Vec<NodeChange> = Vec::new();
            let mut resized: Vec<NodeChange> = Vec::new();
            let mut clicked_node: Option<NodeId> = None;
            let mut any_node_dragged = false;
            for layout in &layouts {
                let resp = ui.allocate_rect(layout.rect, Sense::click_and_drag());

                if resp.dragged() {
                    let delta = resp.drag_delta();
                    if delta != Vec2::ZERO {
                        if let Some(node) = self.state.node(layout.id) {
                            moved.push(NodeChange::Moved {
                                id: layout.id,
                                position: Position::new(
                                    node.position.x + delta.x / zoom,
                                    node.position.y + delta.y / zoom,
                                ),
                            });
                        }
                    }
                    self.dragging = Some(layout.id);
                    any_node_dragged = true;
                }
                if resp.clicked() {
                    clicked_node = Some(layout.id);
                }

                // Hover tooltip: readable details without cluttering the canvas
                resp.on_hover_ui(|ui| {
                    ui.label(egui::RichText::new(&layout.label).strong());
                    ui.monospace(format!("id: {}", layout.id));
                    let degree = self
                        .state
                        .edges
                        .iter()
                        .filter(|e| e.source == layout.id || e.target == layout.id)
                        .count();
                    ui.small(format!("degree: {}", degree));
                });

                // Visuals
                let is_hover = self.hovered == Some(layout.id);
                let is_edit_target = self.selected == Some(layout.id);
                let fill = if layout.canvas_selected || is_edit_target {
                    Color32::from_rgb(80, 120, 255)
                } else {
                    Color32::from_rgb(60, 60, 60)
                };
                let stroke = if is_hover {
                    Stroke::new(2.5, Color32::from_rgb(120, 220, 255))
                } else if layout.canvas_selected || is_edit_target {
                    Stroke::new(2.0, Color32::WHITE)
                } else {
                    Stroke::new(1.5, Color32::DARK_GRAY)
                };
                let rounding = (6.0 * zoom).clamp(2.0, 10.0);
                painter.rect_filled(layout.rect, rounding, fill);
                painter.rect_stroke(layout.rect, rounding, stroke, egui::StrokeKind::Inside);
                painter.text(
                    layout.rect.center(),
                    egui::Align2::CENTER_CENTER,
                    &layout.label,
                    egui::FontId::proportional((13.0 * zoom).clamp(9.0, 20.0)),
                    Color32::WHITE,
                );

                // Report the measured size back as a dimensions event
                let differs = match layout.stored_size {
                    Some((w, h)) => {
                        (w - layout.world_size.0).abs() > 0.5 || (h - layout.world_size.1).abs() > 0.5
                    }
                    None => true,
                };
                if differs {
                    resized.push(NodeChange::Resized { id: layout.id, size: layout.world_size });
                }
            }

            self.on_nodes_change(&moved);
            self.on_nodes_change(&resized);

            if let Some(id) = clicked_node {
                match self.connect_pick {
                    Some(ConnectPick::Source) => {
                        self.connect_pick = Some(ConnectPick::Target { source: id });
                    }
                    Some(ConnectPick::Target { source }) => {
                        self.on_connect(Connection { source, target: id });
                        self.connect_pick = None;
                    }
                    None => self.on_node_click(id),
                }
            } else if bg_resp.clicked() {
                // Pane click drops the canvas selection flags; the edit panel
                // stays open until Save/Cancel/Delete
                let flips: Vec<NodeChange> = self
                    .state
                    .nodes
                    .iter()
                    .filter(|n| n.selected)
                    .map(|n| NodeChange::Selected { id: n.id, selected: false })
                    .collect();
                self.on_nodes_change(&flips);
            }

            if !any_node_dragged {
                self.dragging = None;
                // Background panning when no node is being dragged
                let delta = bg_resp.drag_delta();
                if delta != Vec2::ZERO {
                    self.pan += delta;
                }
            }

            // Delete key removes the canvas-selected nodes and their incident
            // edges (plain removal, not the cascading subtree delete)
            let delete_pressed = ui.input(|i| i.key_pressed(egui::Key::Delete))
                && ui.ctx().memory(|m| m.focused().is_none());
            if delete_pressed {
                let doomed: Vec<NodeId> = self
                    .state
                    .nodes
                    .iter()
                    .filter(|n| n.selected)
                    .map(|n| n.id)
                    .collect();
                if !doomed.is_empty() {
                    let edge_changes: Vec<EdgeChange> = self
                        .state
                        .edges
                        .iter()
                        .filter(|e| doomed.contains(&e.source) || doomed.contains(&e.target))
                        .map(|e| EdgeChange::Removed { id: e.id })
                        .collect();
                    let node_changes: Vec<NodeChange> =
                        doomed.iter().map(|&id| NodeChange::Removed { id }).collect();
                    self.on_nodes_change(&node_changes);
                    self.on_edges_change(&edge_changes);
                    if self.selected.is_some_and(|sid| doomed.contains(&sid)) {
                        self.cancel_edit();
                    }
                }
            }
        });
    }

    fn edit_panel(&mut self, ctx: &egui::Context) {
        let Some(id) = self.selected else { return };
        let mut open = true;
        let mut draft = self.draft_title.clone();
        let mut do_copy = false;
        let mut do_delete = false;
        let mut do_cancel = false;
        let mut do_save = false;

        egui::Window::new("Node details")
            .id(egui::Id::new(("node_details", id)))
            .open(&mut open)
            .resizable(false)
            .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-12.0, 12.0))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new(draft.as_str()).strong());
                    if ui.button("Copy").clicked() {
                        do_copy = true;
                    }
                    if ui
                        .button(egui::RichText::new("Delete").color(Color32::RED))
                        .clicked()
                    {
                        do_delete = true;
                    }
                });
                ui.separator();
                ui.add(egui::TextEdit::singleline(&mut draft).hint_text("Node title"));
                ui.horizontal(|ui| {
                    if ui.button("Cancel").clicked() {
                        do_cancel = true;
                    }
                    if ui.button("Save").clicked() {
                        do_save = true;
                    }
                });
            });

        self.draft_title = draft;
        if do_copy {
            ctx.copy_text(self.draft_title.clone());
            self.notify(
                format!("{} copied to clipboard", self.draft_title),
                NoticeStyle::Subtle,
            );
        }
        if do_save {
            self.save_draft();
        } else if do_delete {
            self.delete_selected_subtree();
        } else if do_cancel || !open {
            self.cancel_edit();
        }
    }

    fn load_versions_window(&mut self, ctx: &egui::Context) {
        if !self.show_load_versions {
            return;
        }
        let mut open = true;
        let mut to_load: Option<std::path::PathBuf> = None;
        let mut loaded_label: Option<String> = None;
        egui::Window::new("Load Version")
            .collapsible(false)
            .resizable(true)
            .open(&mut open)
            .show(ctx, |ui| {
                match persist::list_versions() {
                    Ok(list) => {
                        if list.is_empty() {
                            ui.label("No versioned boards found");
                        }
                        for p in list.iter() {
                            let label = p.file_name().and_then(|s| s.to_str()).unwrap_or("<unknown>");
                            if ui.button(label).clicked() {
                                to_load = Some(p.clone());
                                loaded_label = Some(label.to_string());
                            }
                        }
                    }
                    Err(e) => {
                        ui.colored_label(Color32::RED, format!("List failed: {}", e));
                    }
                }
            });
        if let Some(p) = to_load {
            match persist::load_from_path(&p) {
                Ok(snapshot) => {
                    let label = loaded_label.unwrap_or_else(|| p.display().to_string());
                    self.restore_snapshot(snapshot, &label);
                    self.save_error = None;
                    open = false;
                }
                Err(e) => {
                    self.save_error = Some(format!("Failed to load {}: {}", p.display(), e));
                }
            }
        }
        self.show_load_versions = open;
    }

    fn toast(&mut self, ctx: &egui::Context) {
        // Bottom-right transient info toast (visible for 3 seconds)
        if let (Some(msg), Some(when)) = (&self.last_info, self.last_info_time) {
            if Instant::now().duration_since(when) <= Duration::from_secs(3) {
                let margin = egui::vec2(12.0, 12.0);
                egui::Area::new("bottom_right_toast".into())
                    .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-margin.x, -margin.y))
                    .interactable(false)
                    .show(ctx, |ui| {
                        let (fill, stroke_col, stroke_w, text_col, inner_margin) =
                            match self.last_info_style {
                                NoticeStyle::Subtle => (
                                    Color32::from_rgba_premultiplied(20, 20, 20, 170),
                                    Color32::from_gray(60),
                                    0.5,
                                    Color32::from_gray(200),
                                    egui::Margin::symmetric(8, 6),
                                ),
                                NoticeStyle::Prominent => (
                                    Color32::from_rgba_premultiplied(30, 30, 30, 230),
                                    Color32::from_gray(100),
                                    1.5,
                                    Color32::LIGHT_GREEN,
                                    egui::Margin::symmetric(12, 8),
                                ),
                            };
                        egui::Frame::popup(ui.style())
                            .corner_radius(egui::CornerRadius::same(8))
                            .stroke(Stroke { width: stroke_w, color: stroke_col })
                            .fill(fill)
                            .inner_margin(inner_margin)
                            .show(ui, |ui| match self.last_info_style {
                                NoticeStyle::Subtle => {
                                    ui.small(egui::RichText::new(msg).color(text_col));
                                }
                                NoticeStyle::Prominent => {
                                    ui.colored_label(text_col, msg);
                                }
                            });
                    });
            }
        }
    }
}

impl eframe::App for FlowApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.top_bar(ctx);
        self.canvas(ctx);
        self.edit_panel(ctx);
        self.load_versions_window(ctx);
        self.toast(ctx);
    }
}

// Marching-dash segment walk; a growing phase slides the dashes from a
// toward b
fn draw_dashed_line(
    painter: &egui::Painter,
    a: Pos2,
    b: Pos2,
    stroke: Stroke,
    dash: f32,
    gap: f32,
    phase: f32,
) {
    let dir = Vec2::new(b.x - a.x, b.y - a.y);
    let len = (dir.x * dir.x + dir.y * dir.y).sqrt();
    if len <= f32::EPSILON || dash <= f32::EPSILON {
        return;
    }
    let unit = Vec2::new(dir.x / len, dir.y / len);
    let period = dash + gap;
    let mut t = phase.rem_euclid(period) - period;
    while t < len {
        let start = t.max(0.0);
        let end = (t + dash).min(len);
        if end > start {
            painter.line_segment([a + unit * start, a + unit * end], stroke);
        }
        t += period;
    }
}
